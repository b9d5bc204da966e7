use anyhow::Result;
use clap::Parser;
use mrlease::cmd::worker::Args;
use mrlease::rpc::RemoteCoordinator;
use mrlease::worker::{self, Backoff, WorkerConfig};
use mrlease::{utils, workload};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    utils::init_tracing();
    let args = Args::parse();
    let engine = workload::named(&args.app)?;

    // Connect to coordinator
    let name = format!("worker-{}", std::process::id());
    info!(join = %args.join, %name, "connecting");
    let mut coordinator = RemoteCoordinator::connect(&args.join, name).await?;

    let config = WorkerConfig {
        dir: args.dir,
        aux: utils::serialize_args(&args.args)?,
        backoff: Backoff::default(),
    };
    let stats = worker::run(&mut coordinator, &engine, &config).await?;
    info!(maps = stats.maps, reduces = stats.reduces, waits = stats.waits, "worker finished");
    Ok(())
}
