//! Command line arguments of the binaries under `src/app`.

pub mod coordinator;
pub mod ctl;
pub mod sequential;
pub mod worker;

/// Address workers and `mr-ctl` connect to when none is given.
pub const DEFAULT_COORDINATOR: &str = "127.0.0.1:50051";
