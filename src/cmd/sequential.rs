use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Runs a MapReduce job in a single process", long_about = None)]
pub struct Args {
    /// Glob spec for the input files
    #[arg(short, long)]
    pub input: String,
    /// Name of the workload
    #[arg(short = 'a', long, default_value = "wc")]
    pub app: String,
    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
    /// Number of reduce tasks
    #[arg(short = 'r', long, default_value_t = 10)]
    pub n_reduce: u32,
    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub args: Vec<String>,
}
