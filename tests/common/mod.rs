#![allow(dead_code)]

use std::fs;
use std::path::Path;

use mrlease::worker::{Backoff, WorkerConfig};
use std::time::Duration;

/// Writes the input files into `dir` and returns their paths.
pub fn write_inputs(dir: &Path, inputs: &[(&str, &str)]) -> Vec<String> {
    inputs
        .iter()
        .map(|(name, text)| {
            let path = dir.join(name);
            fs::write(&path, text).unwrap();
            path.to_string_lossy().into_owned()
        })
        .collect()
}

pub fn config(dir: &Path) -> WorkerConfig {
    WorkerConfig {
        backoff: Backoff {
            initial: Duration::from_millis(50),
            max: Duration::from_millis(500),
        },
        ..WorkerConfig::new(dir)
    }
}

/// The lines of `mr-out-<id>` for every reduce task.
pub fn outputs(dir: &Path, n_reduce: u32) -> Vec<Vec<String>> {
    (0..n_reduce)
        .map(|id| {
            fs::read_to_string(dir.join(format!("mr-out-{id}")))
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// Every `mr-*` file in `dir` with its contents, sorted by name.
pub fn job_files(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap())
        .map(|e| e.file_name().into_string().unwrap())
        .filter(|name| name.starts_with("mr-"))
        .map(|name| {
            let contents = fs::read(dir.join(&name)).unwrap();
            (name, contents)
        })
        .collect();
    files.sort();
    files
}
