//! RCON server binary.
//!
//! # Usage
//!
//! ```bash
//! # Insecure mode (no credential configured, every Auth attempt succeeds)
//! rcon-server --host 127.0.0.1 --port 25575
//!
//! # With a credential record produced by `CredentialRecord::hash`/`encode`
//! rcon-server --port 25575 --credential "<salt-b64>:<digest-b64>"
//! ```

use std::sync::Arc;

use clap::Parser;
use rcon_server::{ConnectionManager, EchoExecutor, RawServerConfig, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// RCON protocol server.
#[derive(Parser, Debug)]
#[command(name = "rcon-server")]
#[command(about = "Source-engine RCON protocol server")]
#[command(version)]
struct Args {
    /// Address to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 25575)]
    port: i64,

    /// Maximum concurrent connections.
    #[arg(long, default_value_t = 10)]
    max_connections: i64,

    /// Maximum accepted or emitted frame size, in bytes.
    #[arg(long, default_value_t = 4096)]
    max_frame_size: i64,

    /// Per-socket read timeout and idle cap, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    read_timeout_ms: i64,

    /// Acceptor wakeup interval, in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    accept_timeout_ms: i64,

    /// Stored credential record (`Base64(salt):Base64(digest)`). Omit to
    /// run in insecure mode, where every `Auth` attempt succeeds.
    #[arg(long)]
    credential: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let raw = RawServerConfig {
        host: args.host,
        port: args.port,
        max_connections: args.max_connections,
        max_frame_size: args.max_frame_size,
        read_timeout_ms: args.read_timeout_ms,
        accept_timeout_ms: args.accept_timeout_ms,
        credential: args.credential,
    };
    let config = ServerConfig::validate(raw)?;

    if config.credential.is_none() {
        tracing::warn!("no credential configured — running in insecure mode, every Auth attempt succeeds");
    }

    let manager = ConnectionManager::bind(config, Arc::new(EchoExecutor)).await?;
    tracing::info!(addr = %manager.local_addr()?, "rcon-server listening");

    manager.run().await?;

    Ok(())
}
