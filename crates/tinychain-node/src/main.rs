use clap::Parser;
use std::{net::SocketAddr, time::Duration};
use tinychain_node::{router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Proof-of-work difficulty (leading zero hex chars)
    #[arg(long, default_value_t = 4)]
    difficulty: usize,

    /// Per-peer timeout for chain fetches during conflict resolution
    #[arg(long, default_value_t = 5)]
    peer_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let state = AppState::new(args.difficulty, Duration::from_secs(args.peer_timeout_secs));
    info!(node_id = %state.node_id(), difficulty = args.difficulty, "node initialized");

    let app = router(state);
    let addr: SocketAddr = args.listen.parse()?;
    info!("tinychain-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
