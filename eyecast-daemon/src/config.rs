//! Configuration management

use anyhow::{Context, Result};
use eyecast_broadcaster::ServerConfig;
use eyecast_device::Availability;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Availability reported by the simulated device
    pub availability: Availability,

    /// Synthetic sample rate, 0 disables the generator
    pub sample_rate_hz: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            availability: Availability::Available,
            sample_rate_hz: 60.0,
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Path to configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Interface to listen on
    pub address: String,

    /// WebSocket port
    pub port: u16,

    /// Subprotocol echoed during the handshake (empty = none)
    pub subprotocol: String,

    /// Per-connection outbound queue capacity
    pub outbound_queue: usize,

    pub device: DeviceConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let server = ServerConfig::default();
        Self {
            config_path: Self::default_config_path(),
            address: server.address,
            port: server.port,
            subprotocol: server.subprotocol.unwrap_or_default(),
            outbound_queue: server.outbound_queue,
            device: DeviceConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default location, or create it
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_config_path())
    }

    /// Load configuration from `path`, writing defaults there if missing
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config_path = path.as_ref().to_path_buf();

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

            let mut config: DaemonConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

            config.config_path = config_path;
            Ok(config)
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save()
                .context("Failed to save default config")?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Settings for the WebSocket server
    pub fn server_config(&self) -> ServerConfig {
        let subprotocol = self.subprotocol.trim();
        ServerConfig {
            address: self.address.clone(),
            port: self.port,
            subprotocol: (!subprotocol.is_empty()).then(|| subprotocol.to_string()),
            outbound_queue: self.outbound_queue,
        }
    }

    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eyecast")
            .join("config.toml")
    }
}
