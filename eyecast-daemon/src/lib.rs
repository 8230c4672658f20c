//! eyecast daemon library
//!
//! Re-exports the daemon's modules for integration testing.

pub mod cli;
pub mod config;

pub use cli::Cli;
pub use config::{DaemonConfig, DeviceConfig};
