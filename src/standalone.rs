//! Runs a whole job in one process, without a coordinator.
//!
//! Map tasks run in input order (map id = position), then every reduce
//! task. The same engine and store are used as by workers, so the files
//! produced match a distributed run byte for byte.

use std::path::{Path, PathBuf};

use anyhow::Result;
use bytes::Bytes;
use tracing::info;

use crate::engine::{perform_map, perform_reduce};
use crate::store::IntermediateStore;
use crate::{Error, Workload};

/// Returns the output files, one per reduce task.
pub fn run_job(
    inputs: &[String],
    engine: &Workload,
    serialized_args: &Bytes,
    n_reduce: u32,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    if n_reduce < 1 {
        return Err(Error::InvalidReduceCount.into());
    }
    let store = IntermediateStore::new(dir);
    /*  The map logic carries out mapping and also shuffle: every bucket is
     *  written to its intermediate file right away.
     */
    for (map_id, input) in inputs.iter().enumerate() {
        perform_map(&store, map_id as u32, input, n_reduce, engine, serialized_args)?;
    }
    info!(maps = inputs.len(), "map phase finished");

    // reduce phase
    let n_map = inputs.len() as u32;
    let outputs = (0..n_reduce)
        .map(|reduce_id| perform_reduce(&store, reduce_id, n_map, engine, serialized_args))
        .collect::<Result<Vec<_>>>()?;
    info!(reduces = n_reduce, "job done");
    Ok(outputs)
}
