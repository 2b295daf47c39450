//! Development broker.
//!
//! A minimal stand-in for the production message broker, for running the
//! client locally:
//! - every `peerMessage` is stamped and echoed to all connections, sender included
//! - the first message on a connection announces the author with a `notification`
//! - closing that connection announces that they left
//!
//! Run it, then point the client at it:
//!   cargo run -p livechat-demo-broker -- --port 3000
//!   cargo run -p livechat-cli -- chat --identity alice

mod server;

use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("livechat_broker=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let port = parse_arg(&args, "--port").unwrap_or(3000);

    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    tracing::info!("Starting broker on {}", addr);

    server::run(addr).await
}

fn parse_arg(args: &[String], flag: &str) -> Option<u16> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
