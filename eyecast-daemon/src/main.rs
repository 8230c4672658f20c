//! eyecast daemon - eye-tracking streams over WebSocket
//!
//! Checks that the eye tracker is usable, then serves its state and sample
//! streams on ws://127.0.0.1:8887 until interrupted.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use eyecast_broadcaster::{ConnectionLifecycle, GazeServer};
use eyecast_daemon::{Cli, DaemonConfig};
use eyecast_device::{Availability, DeviceHost, SimulatedHost};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    info!("👁️ Starting eyecast daemon v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => DaemonConfig::load_from(path),
        None => DaemonConfig::load(),
    }
    .context("Failed to load configuration")?;
    cli.apply(&mut config);

    info!("📋 Configuration loaded from {}", config.config_path.display());

    let host = SimulatedHost::with_availability(config.device.availability);
    match host.availability() {
        Availability::Available => info!("✓ Eye tracker available"),
        Availability::NotAvailable => {
            error!("The eye tracking engine is not available. Install it and try again.");
            bail!("eye tracking engine not available");
        }
        Availability::NotRunning => {
            error!("The eye tracking engine is not running. Start it and try again.");
            bail!("eye tracking engine not running");
        }
    }

    let lifecycle = Arc::new(ConnectionLifecycle::new(Arc::new(host.clone())));
    let server = GazeServer::new(config.server_config(), lifecycle);

    let addr = match server.start().await {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to start server on port {}: {}", config.port, e);
            return Err(e).context("Failed to start server");
        }
    };

    let rate = config.device.sample_rate_hz;
    let _generator = if rate > 0.0 {
        match host.spawn_generator(rate) {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!("⚠️ Sample generator not started: {}", e);
                None
            }
        }
    } else {
        info!("Sample generator disabled");
        None
    };
    host.announce_tracking();

    info!("🚀 eyecast daemon ready on ws://{}", addr);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("🛑 Received shutdown signal");

    info!("🧹 Shutting down...");
    server.stop().await.context("Failed to stop server")?;
    info!("👋 eyecast daemon stopped");

    Ok(())
}
