//! Demo service.
//!
//! Serves "Hello World" behind the lifecycle gate, with countdown startup
//! and shutdown hooks. SIGTERM/SIGINT (or a `shutdown` line on stdin with
//! `--stdin-control`) runs the graceful shutdown.

use axum::{routing::get, Router};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

use service_lifecycle::config::{self, AppConfig, ListenerConfig};
use service_lifecycle::events::Event;
use service_lifecycle::lifecycle::{Application, RunningState};
use service_lifecycle::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "service-lifecycle")]
#[command(about = "Demo service with a supervised lifecycle", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Treat a `shutdown` line on stdin as a shutdown request.
    #[arg(long)]
    stdin_control: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig {
            banner: Some("ExampleApplication/1.0.0".to_string()),
            ..AppConfig::default()
        },
    };

    logging::init(&config.observability)?;
    tracing::info!("service-lifecycle v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listeners_configured = !config.listeners.is_empty();
    let router = Router::new().fallback(get(|| async { "Hello World" }));

    let app = Application::builder(config)
        .routes(router)
        .on_startup(|_| countdown("Starting", 3))
        .on_shutdown(|event: Arc<Event<_>>| async move {
            let ok = countdown("Shutting Down", 3).await;
            event.source.close_listeners().await;
            ok
        })
        .on_listening(|event: Arc<Event<Vec<String>>>| async move {
            tracing::info!(addresses = ?event.payload, "On Listening has been called");
        })
        .build();

    if !listeners_configured {
        app.add_listener(ListenerConfig::default())?;
    }

    app.listen_for_signals()?;
    if cli.stdin_control {
        app.listen_for_messages(BufReader::new(tokio::io::stdin()));
    }

    let state = app.start().await?;
    tracing::info!(state = %state, "Startup finished");

    // The shutdown coordinator exits the process; wait until it does.
    let mut states = app.watch_state();
    states.wait_for(|s| *s == RunningState::ShuttingDown).await?;
    std::future::pending::<()>().await;
    Ok(())
}

async fn countdown(label: &str, limit: u32) -> bool {
    for remaining in (1..=limit).rev() {
        tracing::info!("{} in {}", label, remaining);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    true
}
