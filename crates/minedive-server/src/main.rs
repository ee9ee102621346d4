//! minedive-server binary.

use clap::Parser;
use minedive_server::{CliOverrides, RelayServer, ServerConfig};
use std::path::PathBuf;
use tracing::{error, info};

/// minedive-server — WebSocket signaling relay
#[derive(Parser, Debug)]
#[command(name = "minedive-server", version, about = "WebSocket signaling relay")]
struct Cli {
    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen address
    #[arg(long)]
    bind: Option<String>,

    /// Config file path
    #[arg(long, default_value = "~/.minedive/config.toml")]
    config: String,

    /// Largest accepted message in bytes
    #[arg(long)]
    max_message_size: Option<usize>,

    /// Per-connection outbound queue capacity
    #[arg(long)]
    outbound_queue: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    use tracing_subscriber::EnvFilter;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting minedive-server");

    let config_path = PathBuf::from(&cli.config);
    let overrides = CliOverrides {
        bind: cli.bind,
        port: cli.port,
        max_message_size: cli.max_message_size,
        outbound_queue: cli.outbound_queue,
    };
    let config = match ServerConfig::load(Some(&config_path), overrides) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let server = RelayServer::new(config);
    let shutdown = server.shutdown_handle();
    let mut running = tokio::spawn(server.run());

    let result = tokio::select! {
        result = &mut running => result,
        _ = shutdown_signal() => {
            info!("received shutdown signal");
            let _ = shutdown.send(());
            running.await
        }
    };

    match result {
        Ok(Ok(())) => info!("minedive-server stopped"),
        Ok(Err(e)) => {
            error!(error = %e, "server error");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "server task failed");
            std::process::exit(1);
        }
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
