//! Map and reduce handling for a single task.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bytes::Bytes;
use itertools::Itertools;
use tracing::debug;

use crate::store::IntermediateStore;
use crate::*;

// types related to this engine
type BucketIndex = u32;
type Buckets = BTreeMap<BucketIndex, Vec<KeyValue>>;

/// Runs map task `map_id` over `input` and writes one intermediate file per
/// non-empty bucket. Files this map task left for now-empty buckets in an
/// earlier run are removed. Returns the written paths.
pub fn perform_map(
    store: &IntermediateStore,
    map_id: u32,
    input: &str,
    n_reduce: u32,
    engine: &Workload,
    serialized_args: &Bytes,
) -> Result<Vec<PathBuf>> {
    let buf = fs::read(input).with_context(|| format!("cannot open {input}"))?;
    let content =
        String::from_utf8(buf).with_context(|| format!("{input} is not valid UTF-8"))?;
    // The map function sees <file name, whole content>.
    let input_kv = KeyValue::new(input, content);

    let mut buckets = Buckets::new();
    for item in (engine.map_fn)(input_kv, serialized_args.clone())? {
        let kv = item?;
        buckets
            .entry(bucket(&kv.key, n_reduce))
            .or_default()
            .push(kv);
    }

    let mut written = Vec::with_capacity(buckets.len());
    for bucket_no in 0..n_reduce {
        match buckets.remove(&bucket_no) {
            Some(mut key_values) => {
                // Stable, so a re-executed task writes byte-identical files.
                key_values.sort_by(|a, b| a.key.cmp(&b.key));
                written.push(store.write_bucket(map_id, bucket_no, &key_values)?);
            }
            None => store.remove_bucket(map_id, bucket_no)?,
        }
    }
    debug!(map_id, input, files = written.len(), "map output written");
    Ok(written)
}

/// Runs reduce task `reduce_id`: merges the bucket's intermediate files of
/// map tasks `0..n_map`, calls the reduce function once per distinct key in
/// ascending order, and writes `mr-out-<reduce_id>`.
pub fn perform_reduce(
    store: &IntermediateStore,
    reduce_id: u32,
    n_map: u32,
    engine: &Workload,
    serialized_args: &Bytes,
) -> Result<PathBuf> {
    let mut intermediate = Vec::new();
    for path in store.bucket_files(reduce_id, n_map)? {
        intermediate.append(&mut store.read_records(&path)?);
    }
    intermediate.sort_by(|a, b| a.key.cmp(&b.key));

    let reduce_func = engine.reduce_fn;
    let mut output: Vec<(String, String)> = Vec::new();
    // Iterate through the values associated with each key and apply reduce function.
    for (key, value_group) in &intermediate.into_iter().chunk_by(|kv| kv.key.clone()) {
        let iter = value_group.map(KeyValue::into_value);
        let result = reduce_func(&key, Box::new(iter), serialized_args.clone())
            .with_context(|| format!("reduce failed for key {key:?}"))?;
        output.push((key, result));
    }

    let path = store.write_output(
        reduce_id,
        output.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )?;
    debug!(reduce_id, keys = output.len(), "reduce output written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn wc() -> Workload {
        workload::named("wc").unwrap()
    }

    fn no_args() -> Bytes {
        Bytes::from_static(b"[]")
    }

    fn write_input(dir: &Path, name: &str, content: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn map_partitions_by_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::new(dir.path());
        let input = write_input(dir.path(), "in.txt", "a b a c d e f");

        let n_reduce = 3;
        let written = perform_map(&store, 0, &input, n_reduce, &wc(), &no_args()).unwrap();
        assert!(!written.is_empty());

        for path in written {
            let records = store.read_records(&path).unwrap();
            assert!(!records.is_empty());
            let bucket_no = path
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .rsplit('-')
                .next()
                .unwrap()
                .parse::<u32>()
                .unwrap();
            for kv in &records {
                assert_eq!(bucket(&kv.key, n_reduce), bucket_no);
            }
            let keys: Vec<_> = records.iter().map(|kv| kv.key.clone()).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            assert_eq!(keys, sorted);
        }
    }

    #[test]
    fn map_skips_empty_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::new(dir.path());
        let input = write_input(dir.path(), "in.txt", "only");

        let written = perform_map(&store, 4, &input, 8, &wc(), &no_args()).unwrap();
        assert_eq!(written, vec![store.intermediate_path(4, bucket("only", 8))]);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::new(dir.path());
        let missing = dir.path().join("nope.txt");
        let err = perform_map(&store, 0, &missing.to_string_lossy(), 1, &wc(), &no_args()).unwrap_err();
        assert!(err.to_string().contains("cannot open"));
    }

    #[test]
    fn non_utf8_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::new(dir.path());
        let path = dir.path().join("bin.dat");
        fs::write(&path, [0xff, 0xfe]).unwrap();
        let err = perform_map(&store, 0, &path.to_string_lossy(), 1, &wc(), &no_args()).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn reduce_groups_values_across_map_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::new(dir.path());
        store
            .write_bucket(0, 0, &[KeyValue::new("b", "1"), KeyValue::new("a", "1")])
            .unwrap();
        store
            .write_bucket(7, 0, &[KeyValue::new("a", "1"), KeyValue::new("c", "1")])
            .unwrap();
        // Other buckets are not read.
        store.write_bucket(0, 1, &[KeyValue::new("a", "1")]).unwrap();

        let path = perform_reduce(&store, 0, 8, &wc(), &no_args()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "a 2\nb 1\nc 1\n");
    }

    #[test]
    fn reduce_ignores_files_of_map_ids_outside_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::new(dir.path());
        for map_id in 0..3 {
            store.write_bucket(map_id, 0, &[KeyValue::new("x", "1")]).unwrap();
        }
        let path = perform_reduce(&store, 0, 1, &wc(), &no_args()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "x 1\n");
    }

    #[test]
    fn re_executed_map_drops_buckets_that_became_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::new(dir.path());
        let input = write_input(dir.path(), "in.txt", "only");
        let other = (bucket("only", 2) + 1) % 2;
        store.write_bucket(0, other, &[KeyValue::new("stale", "1")]).unwrap();

        perform_map(&store, 0, &input, 2, &wc(), &no_args()).unwrap();
        assert!(!store.intermediate_path(0, other).exists());
        assert!(store.intermediate_path(0, bucket("only", 2)).exists());
    }

    #[test]
    fn reduce_without_intermediate_files_writes_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::new(dir.path());
        let path = perform_reduce(&store, 3, 0, &wc(), &no_args()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }

    #[test]
    fn re_executed_map_writes_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::new(dir.path());
        let input = write_input(dir.path(), "in.txt", "the quick brown fox jumps over the lazy dog");

        let first = perform_map(&store, 0, &input, 4, &wc(), &no_args()).unwrap();
        let before: Vec<_> = first.iter().map(|p| fs::read(p).unwrap()).collect();
        let second = perform_map(&store, 0, &input, 4, &wc(), &no_args()).unwrap();
        let after: Vec<_> = second.iter().map(|p| fs::read(p).unwrap()).collect();

        assert_eq!(first, second);
        assert_eq!(before, after);
    }
}
