//! Command line interface

use clap::Parser;
use std::path::PathBuf;

use crate::config::DaemonConfig;

#[derive(Parser, Debug, Default)]
#[command(name = "eyecast-daemon", version, about = "Serve a local eye tracker to WebSocket clients")]
pub struct Cli {
    /// Port to listen on; a value that is not a port number is ignored
    pub port: Option<String>,

    /// Interface to listen on
    #[arg(long)]
    pub address: Option<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Synthetic sample rate in Hz, 0 disables the generator
    #[arg(long, value_name = "HZ")]
    pub sample_rate: Option<f64>,
}

impl Cli {
    /// Override configuration values with the ones given on the command line
    pub fn apply(&self, config: &mut DaemonConfig) {
        if let Some(raw) = &self.port {
            match raw.trim().parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => tracing::warn!(
                    "Ignoring invalid port argument {:?}, using {}",
                    raw,
                    config.port
                ),
            }
        }

        if let Some(address) = &self.address {
            config.address = address.clone();
        }

        if let Some(rate) = self.sample_rate {
            config.device.sample_rate_hz = rate;
        }
    }
}
