use anyhow::Result;
use clap::Parser;
use mrlease::cmd::ctl::{Args, Commands};
use mrlease::registry::{Progress, StatusCounts};
use mrlease::rpc::RemoteCoordinator;

fn display_counts(kind: &str, counts: &StatusCounts) {
    println!(
        "{kind}\tIdle: {}\tAssigned: {}\tCompleted: {} / {}",
        counts.idle,
        counts.assigned,
        counts.completed,
        counts.total()
    );
}

fn display_job_status(progress: &Progress) {
    println!("---------- JOB STATUS ----------");
    display_counts("MAP", &progress.map);
    display_counts("REDUCE", &progress.reduce);
    println!("--------------------------------");
    if progress.is_done() {
        println!("Job is done");
    } else if progress.map.completed < progress.map.total() {
        println!("Job is in the map phase");
    } else {
        println!("Job is in the reduce phase");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut client = RemoteCoordinator::connect(&args.host, "mr-ctl").await?;

    match args.command {
        Commands::Status {} => {
            let progress = client.job_status().await?;
            display_job_status(&progress);
        }
    }

    Ok(())
}
