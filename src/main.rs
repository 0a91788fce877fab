//! socksd - SOCKS5 proxy server
//!
//! Main entry point: CLI parsing, logging setup, and server startup.

use anyhow::Result;
use clap::Parser;
use socksd::config::{load_config, Config};
use socksd::server::Socks5Server;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// socksd - SOCKS5 proxy server (RFC 1928)
#[derive(Parser, Debug)]
#[command(name = "socksd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration file
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.log_level, args.json_log)?;

    let mut config = match &args.config {
        Some(path) => {
            let config = load_config(path)?;
            info!("configuration loaded from: {:?}", path);
            config
        }
        None => Config {
            server: Default::default(),
        },
    };

    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }

    info!("socksd v{}", socksd::VERSION);

    let server = Socks5Server::new(config.server);

    tokio::select! {
        result = server.run() => result,
        _ = shutdown_signal() => {
            info!("shutdown signal received, exiting");
            Ok(())
        }
    }
}

/// Wait for Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Install the global tracing subscriber.
///
/// Connection-level events log at debug, per-request outcomes at
/// info/warn; `--json-log` switches to machine-readable output for log
/// shippers.
fn setup_logging(level: Level, json: bool) -> Result<()> {
    let builder = FmtSubscriber::builder().with_max_level(level);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.compact().finish())?;
    }

    Ok(())
}
