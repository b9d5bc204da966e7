//! A fault-tolerant MapReduce system built around task leases.
//!
//! A single coordinator hands out map tasks, then (once every map task has
//! completed) reduce tasks, to a pool of stateless workers sharing a
//! filesystem. Workers that crash or stall simply lose their lease and the
//! task is handed to someone else; all writes overwrite, so duplicated
//! attempts converge to the same result.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;

pub mod cmd;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod registry;
pub mod rpc;
pub mod standalone;
pub mod store;
pub mod task;
pub mod utils;
pub mod worker;
pub mod workload;

pub use error::Error;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The output of an application map function.
///
/// There are 2 layers of [`anyhow::Result`]s here. The outer layer
/// accounts for errors that arise while creating the iterator.
/// The inner layer accounts for errors that occur during iteration.
///
/// This accomodates both batch (all keys emitted at once) and lazy
/// (keys only emitted when the iterator is consumed) map operations.
pub type MapOutput = anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<KeyValue>>>>;

/// A map function takes the input file as a key-value pair (file name,
/// file content) and auxiliary arguments.
///
/// It returns an iterator that yields intermediate key-value pairs.
pub type MapFn = fn(kv: KeyValue, aux: Bytes) -> MapOutput;

/// A reduce function takes in a key, an iterator over values for that key,
/// and an auxiliary argument. It returns the result written next to the key
/// in the output file.
pub type ReduceFn = fn(
    key: &str,
    values: Box<dyn Iterator<Item = String> + '_>,
    aux: Bytes,
) -> anyhow::Result<String>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct KeyValue {
    /// The key.
    pub key: String,
    /// The value.
    pub value: String,
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Get the key of this key-value pair.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the value of this key-value pair.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> String {
        self.value
    }
}

/////////////////////////////////////////////////////////////////////////////
// Partitioning
/////////////////////////////////////////////////////////////////////////////

/// Hashes an intermediate key with FNV-1a, masked to a non-negative
/// 31-bit value.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(key);
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Computes the reduce bucket for a given key as `ihash(key) % n_reduce`.
///
/// Every worker, and every re-execution of a map task, routes a key to the
/// same bucket. `n_reduce` must be non-zero; the coordinator refuses to
/// start a job otherwise.
pub fn bucket(key: &str, n_reduce: u32) -> u32 {
    ihash(key.as_bytes()) % n_reduce
}
