//! Utility functions shared by the binaries.

use anyhow::{bail, Result};
use bytes::Bytes;
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. Honors `RUST_LOG`, defaulting
/// to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Expands each input glob spec into the files it matches, in order.
///
/// A spec without glob metacharacters is kept as is, so plain file names
/// work even before the file exists. A glob matching nothing is an error.
pub fn expand_inputs(specs: &[String]) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for spec in specs {
        if !spec.contains(['*', '?', '[']) {
            files.push(spec.clone());
            continue;
        }
        let before = files.len();
        for path in glob::glob(spec)? {
            files.push(path?.to_string_lossy().into_owned());
        }
        if files.len() == before {
            bail!("no input files match `{spec}`");
        }
    }
    Ok(files)
}

/// Encodes extra command line arguments as the auxiliary argument handed to
/// map and reduce functions.
pub fn serialize_args(args: &[String]) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(args)?))
}
