//! tb-proxy: HTTP/JSON gateway in front of a ledger cluster.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tb_bridge::config::parse_addresses;
use tb_bridge::{Identifier, TransportKind};
use tb_proxy::config::Config;
use tb_proxy::state::AppState;

/// HTTP/JSON gateway in front of a ledger cluster.
#[derive(Parser, Debug)]
#[command(name = "tb-proxy")]
#[command(about = "HTTP/JSON gateway in front of a ledger cluster", long_about = None)]
struct Args {
    /// Address to bind the HTTP server.
    #[arg(long, default_value = "127.0.0.1:8080")]
    address: String,

    /// Comma-separated ledger addresses.
    #[arg(long, default_value = "127.0.0.1:3000")]
    ledger_addresses: String,

    /// Ledger cluster id (hex).
    #[arg(long, default_value = "0")]
    cluster_id: Identifier,

    /// Transport used to reach the ledger (stream or http).
    #[arg(long, default_value = "stream")]
    transport: TransportKind,

    /// Deadline for each ledger request, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    if args.transport == TransportKind::Native {
        return Err("the native transport needs a library and is not available here".into());
    }

    let address: SocketAddr = args.address.parse()?;
    let config = Config {
        address,
        ledger_addresses: parse_addresses(&args.ledger_addresses)?,
        cluster_id: args.cluster_id,
        transport: args.transport,
        request_timeout: Duration::from_millis(args.request_timeout_ms),
    };

    let state = AppState::new(config).await?;

    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!("tb-proxy listening on http://{}", address);

    tb_proxy::serve(listener, state).await?;

    Ok(())
}
