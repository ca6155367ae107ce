//! API gateway entry point.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │                 API GATEWAY                   │
//!                  │                                               │
//!  Client Request  │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!  ────────────────┼─▶│  http   │──▶│ routing  │──▶│ upstream  │──┼──▶ Backend
//!                  │  │ server  │   │  table   │   │ forwarder │  │    Service
//!                  │  └─────────┘   └──────────┘   └─────┬─────┘  │
//!                  │                                     │        │
//!  Client Response │                              ┌──────┴──────┐ │
//!  ◀───────────────┼──────────────────────────────│ connection  │ │
//!                  │        streamed body         │    pools    │ │
//!                  │                              └─────────────┘ │
//!                  │                                               │
//!                  │  config · lifecycle · observability           │
//!                  └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use api_gateway::config::load_config;
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::{signals, Shutdown};
use api_gateway::observability;

#[derive(Parser)]
#[command(name = "api-gateway")]
#[command(about = "Path-prefix routing HTTP gateway", long_about = None)]
struct Args {
    /// Path to the gateway configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Configuration errors are fatal: better no gateway than one with
    // partial routing.
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("refusing to start: {err}");
            std::process::exit(1);
        }
    };

    observability::logging::init(&config.observability.log_level);

    tracing::info!(
        config = %args.config.display(),
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
