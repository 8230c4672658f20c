//! Eye-tracking device interface for eyecast
//!
//! The broadcaster never talks to hardware directly. It consumes a
//! [`DeviceHost`], which provides:
//!
//! - an availability check done once at startup
//! - facet change notifications (presence, profile, status, tracking,
//!   screen bounds, display size) multiplexed through one callback
//! - three on-demand sample streams that can be flipped on and off
//!
//! [`SimulatedHost`] is a software device implementing the same interface,
//! used by the daemon when no hardware backend is configured and by tests.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use eyecast_device::{DataStream, DeviceHost, GazePointData, SimulatedHost, StreamKind, StreamSample};
//!
//! let host = SimulatedHost::new();
//! let stream = host
//!     .create_stream(StreamKind::GazePoint, Arc::new(|sample: StreamSample| println!("{:?}", sample)))
//!     .unwrap();
//! assert!(stream.is_enabled());
//!
//! host.emit(StreamSample::GazePoint(GazePointData { x: 10.0, y: 20.0, timestamp: 1.0 }));
//! ```

pub mod error;
pub mod host;
pub mod models;
pub mod simulated;

// Re-exports
pub use error::{DeviceError, Result};
pub use host::{DataStream, DeviceHost, FacetCallback, SampleCallback};
pub use models::{
    Availability, DeviceState, EyePositionData, EyeTrackingDeviceStatus, FacetChange,
    GazePointData, GazeTracking, HeadPoseData, HeadRotationFlags, Rectangle, Size, StreamKind,
    StreamSample, UserPresence, Vector3,
};
pub use simulated::{GeneratorGuard, SimulatedHost, StreamStats};
