use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Runs a MapReduce job and serves tasks to workers", long_about = None)]
pub struct Args {
    /// Input files; glob specs such as `data/pg-*.txt` are expanded
    #[arg(required = true)]
    pub inputs: Vec<String>,
    /// Number of reduce tasks
    #[clap(short = 'r', long, default_value_t = 10)]
    pub n_reduce: u32,
    /// Port for the coordinator to listen on
    #[clap(short = 'P', long, default_value_t = 50051)]
    pub port: u16,
    /// Seconds a worker may hold a task before it is reassigned
    #[clap(short = 't', long, default_value_t = 10)]
    pub lease_secs: u64,
    /// Milliseconds between checks for job completion
    #[clap(long, default_value_t = 1000)]
    pub poll_ms: u64,
}

impl Args {
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}
