//! Intermediate and output files on the shared filesystem.
//!
//! Map task `m` writes bucket `r` to `mr-m-r`; reduce task `r` writes
//! `mr-out-r`. Every write lands in a hidden temporary file first and is
//! renamed over its final name, so re-executed or duplicated attempts
//! overwrite each other and readers never observe a partial file.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::KeyValue;

const PREFIX: &str = "mr-";
const OUTPUT_PREFIX: &str = "mr-out-";
const TEMP_PREFIX: &str = ".mr-tmp-";

#[derive(Debug, Clone)]
pub struct IntermediateStore {
    dir: PathBuf,
}

impl IntermediateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn intermediate_path(&self, map_id: u32, bucket: u32) -> PathBuf {
        self.dir.join(format!("{PREFIX}{map_id}-{bucket}"))
    }

    pub fn output_path(&self, reduce_id: u32) -> PathBuf {
        self.dir.join(format!("{OUTPUT_PREFIX}{reduce_id}"))
    }

    /// Writes one bucket of a map task's output, one JSON record per line.
    pub fn write_bucket(&self, map_id: u32, bucket: u32, records: &[KeyValue]) -> Result<PathBuf> {
        let path = self.intermediate_path(map_id, bucket);
        self.write_atomic(&path, |out| {
            for kv in records {
                serde_json::to_writer(&mut *out, kv)?;
                out.write_all(b"\n")?;
            }
            Ok(())
        })?;
        Ok(path)
    }

    /// Removes a map task's file for `bucket`, if any. A re-executed map
    /// task whose bucket turned out empty must not leave an older file behind.
    pub fn remove_bucket(&self, map_id: u32, bucket: u32) -> Result<()> {
        let path = self.intermediate_path(map_id, bucket);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("cannot remove {}", path.display()))
            }
            _ => Ok(()),
        }
    }

    /// Every intermediate file written for `bucket` by map tasks
    /// `0..n_map`, ordered by map id. Files of higher map ids belong to
    /// some other job and are ignored.
    pub fn bucket_files(&self, bucket: u32, n_map: u32) -> Result<Vec<PathBuf>> {
        let pattern = format!(
            "{}/{PREFIX}*-{bucket}",
            glob::Pattern::escape(&self.dir.to_string_lossy())
        );
        let mut files = Vec::new();
        for entry in glob::glob(&pattern)? {
            let path = entry?;
            // `mr-*-r` also matches `mr-out-r`; keep numeric map ids only.
            match parse_intermediate(&path, bucket) {
                Some(map_id) if map_id < n_map => files.push((map_id, path)),
                _ => {}
            }
        }
        files.sort();
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    /// Decodes every record of an intermediate file.
    pub fn read_records(&self, path: &Path) -> Result<Vec<KeyValue>> {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let mut records = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("cannot read {}", path.display()))?;
            if line.is_empty() {
                continue;
            }
            let kv = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}: malformed record", path.display(), n + 1))?;
            records.push(kv);
        }
        Ok(records)
    }

    /// Writes the final output of a reduce task: one `<key> <result>` line
    /// per entry, in the given order.
    pub fn write_output<'a>(
        &self,
        reduce_id: u32,
        lines: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<PathBuf> {
        let path = self.output_path(reduce_id);
        self.write_atomic(&path, |out| {
            for (key, result) in lines {
                writeln!(out, "{key} {result}")?;
            }
            Ok(())
        })?;
        Ok(path)
    }

    fn write_atomic<F>(&self, path: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> Result<()>,
    {
        let tmp = self.dir.join(format!("{TEMP_PREFIX}{}", Uuid::new_v4()));
        let result = (|| -> Result<()> {
            let mut out = BufWriter::new(
                File::create(&tmp).with_context(|| format!("cannot create {}", tmp.display()))?,
            );
            write(&mut out)?;
            out.into_inner()
                .map_err(|e| e.into_error())?
                .sync_all()?;
            fs::rename(&tmp, path)
                .with_context(|| format!("cannot rename {} to {}", tmp.display(), path.display()))
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

fn parse_intermediate(path: &Path, bucket: u32) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let (map_id, rest) = name.strip_prefix(PREFIX)?.split_once('-')?;
    if rest != bucket.to_string() {
        return None;
    }
    map_id.parse().ok()
}
