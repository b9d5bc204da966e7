//! A MapReduce-compatible implementation of `grep`.
//!
//! Output lines read `<file> <line numbers>`, e.g. `pg-1.txt 3,17`.

use crate::*;
use anyhow::Result;
use bytes::Bytes;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug, Serialize, Deserialize)]
#[clap(no_binary_name = true)]
struct Args {
    #[clap(short, long, value_parser)]
    term: String,
}

fn parse_args(aux: &Bytes) -> Result<Args> {
    Ok(Args::try_parse_from(serde_json::from_slice::<Vec<String>>(aux)?)?)
}

#[allow(clippy::needless_collect)]
pub fn map(kv: KeyValue, aux: Bytes) -> MapOutput {
    let term = parse_args(&aux)?.term;

    let lines = kv
        .value
        .lines()
        .enumerate()
        .filter(|(_, s)| s.contains(&term))
        .map(|(i, _)| i + 1)
        .collect::<Vec<_>>();

    let file = kv.key;
    let iter = lines
        .into_iter()
        .map(move |line_num| Ok::<_, anyhow::Error>(KeyValue::new(file.clone(), line_num.to_string())));
    Ok(Box::new(iter))
}

/// Joins the matching line numbers of a file in ascending order.
pub fn reduce(
    _key: &str,
    values: Box<dyn Iterator<Item = String> + '_>,
    _aux: Bytes,
) -> Result<String> {
    let mut line_nums = values
        .map(|v| v.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()?;
    line_nums.sort_unstable();
    line_nums.dedup();
    Ok(line_nums
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(","))
}
