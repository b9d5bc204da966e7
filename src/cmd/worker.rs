use std::path::PathBuf;

use clap::Parser;

use super::DEFAULT_COORDINATOR;

#[derive(Parser, Debug)]
#[command(version, about = "Executes map and reduce tasks for a coordinator", long_about = None)]
pub struct Args {
    /// Connect to a coordinator at the given IP address and port
    #[clap(short, long, default_value = DEFAULT_COORDINATOR)]
    pub join: String,
    /// Name of the workload
    #[clap(short, long, default_value = "wc")]
    pub app: String,
    /// Directory for intermediate and output files
    #[clap(short, long, default_value = ".")]
    pub dir: PathBuf,
    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub args: Vec<String>,
}
