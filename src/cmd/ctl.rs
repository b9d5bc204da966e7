use clap::{Parser, Subcommand};

use super::DEFAULT_COORDINATOR;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,
    #[clap(short = 'J', long, default_value = DEFAULT_COORDINATOR)]
    pub host: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Displays how many map and reduce tasks are idle, assigned and
    /// completed, and whether the job is done.
    Status {},
}
