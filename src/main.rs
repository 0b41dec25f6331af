//! coverd - Spotify cover relay daemon

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use coverd::{Config, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Spotify cover relay for 64x64 RGB565 displays
#[derive(Parser, Debug)]
#[command(name = "coverd", version, about)]
struct Args {
    /// TOML config file (environment variables take precedence)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides HOST and PORT
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// SQLite database file, overrides DATABASE_PATH
    #[arg(short, long)]
    database: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let (json_layer, text_layer) = if args.log_json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coverd=info,tower_http=debug".into()),
        )
        .with(json_layer)
        .with(text_layer)
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(addr) = args.bind {
        config = config.with_bind_addr(addr);
    }
    if let Some(database) = args.database {
        config.database_path = Some(database);
    }

    let server = Arc::new(Server::new(config).await?);

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_server.shutdown();
        }
    });

    server.run().await?;

    Ok(())
}
