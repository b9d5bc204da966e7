//! A MapReduce-compatible implementation of word count.
//!

use crate::*;
use anyhow::{Context, Result};
use bytes::Bytes;

/// Emits `(word, "1")` for every alphabetic word of the file.
pub fn map(kv: KeyValue, _aux: Bytes) -> MapOutput {
    let words = kv
        .value
        .split(|c: char| !c.is_alphabetic())
        .filter(|s| !s.is_empty())
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>();

    let iter = words
        .into_iter()
        .map(|word| Ok::<_, anyhow::Error>(KeyValue::new(word, "1")));
    Ok(Box::new(iter))
}

/// Sums the counts of a word.
pub fn reduce(
    key: &str,
    values: Box<dyn Iterator<Item = String> + '_>,
    _aux: Bytes,
) -> Result<String> {
    let mut count: u64 = 0;
    for value in values {
        count += value
            .parse::<u64>()
            .with_context(|| format!("bad count {value:?} for {key:?}"))?;
    }
    Ok(count.to_string())
}
