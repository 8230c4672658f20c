//! Real-time eye-tracking broadcaster
//!
//! This crate serves the live feeds of an eye-tracking device to local
//! WebSocket clients. Each client opts in and out of every feed on its own;
//! a device stream is only running while at least one client wants it.
//!
//! # Components
//!
//! - [`DeviceStateTracker`] - last known value of every device facet
//! - [`StreamRegistry`] - lazily created, toggled device streams
//! - [`SubscriptionManager`] - per-stream subscriber sets, drives the registry
//! - [`BroadcastEngine`] - serializes envelopes and fans them out
//! - [`ConnectionLifecycle`] - connect / disconnect / inbound command handling
//! - [`GazeServer`] - WebSocket transport feeding the lifecycle
//!
//! # Protocol
//!
//! Clients send plain text commands: `state`, `startGazePoint`,
//! `startHeadPose`, `startEyePosition`, `stopGazePoint`, `stopHeadPose`,
//! `stopEyePosition`. Anything else is ignored.
//!
//! The server sends JSON envelopes `{"type": ..., "data": ...}` where `type`
//! is one of `state`, `gazePoint`, `headPose`, `eyePosition`.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use eyecast_broadcaster::{ConnectionLifecycle, GazeServer, ServerConfig};
//! use eyecast_device::SimulatedHost;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = SimulatedHost::new();
//!     let lifecycle = Arc::new(ConnectionLifecycle::new(Arc::new(host.clone())));
//!
//!     let server = GazeServer::new(ServerConfig::default(), lifecycle);
//!     let addr = server.start().await?;
//!     println!("listening on ws://{}", addr);
//!
//!     // Drive the device
//!     let _generator = host.spawn_generator(60.0)?;
//!     host.announce_tracking();
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcaster;
pub mod client;
pub mod commands;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod server;
pub mod state;
pub mod streams;
pub mod subscriptions;

// Re-exports
pub use broadcaster::BroadcastEngine;
pub use client::{ClientSet, Connection, ConnectionId, ConnectionState, SendFailure};
pub use commands::ClientCommand;
pub use error::{BroadcasterError, Result};
pub use events::Envelope;
pub use lifecycle::ConnectionLifecycle;
pub use server::{GazeServer, ServerConfig};
pub use state::DeviceStateTracker;
pub use streams::{StreamRegistry, StreamStatus};
pub use subscriptions::{SubscriberTable, SubscriptionManager};
