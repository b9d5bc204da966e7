use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use mrlease::cmd::coordinator::Args;
use mrlease::coordinator::service::CoordinatorService;
use mrlease::coordinator::Coordinator;
use mrlease::utils;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tonic::transport::Server;
use tracing::info;

/* 
    Only one coordinator per job !!
*/

#[tokio::main]
async fn main() -> Result<()> {
    utils::init_tracing();
    let args = Args::parse();

    let inputs = utils::expand_inputs(&args.inputs)?;
    let coordinator = Coordinator::new(inputs, args.n_reduce, args.lease())?;

    // Port to listen to
    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(
        Server::builder()
            .add_service(CoordinatorService::new(coordinator.clone()).into_server())
            .serve_with_shutdown(addr, async move {
                let _ = stop_rx.await;
            }),
    );
    info!(%addr, "coordinator listening");

    // The job driver: poll until every task is completed.
    while !coordinator.is_done() {
        if server.is_finished() {
            break;
        }
        sleep(args.poll_interval()).await;
    }

    let _ = stop_tx.send(());
    server.await??;
    info!("job done, coordinator exiting");
    Ok(())
}
