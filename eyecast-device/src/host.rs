//! Device collaborator traits consumed by the broadcaster

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Availability, FacetChange, StreamKind, StreamSample};

/// Callback for facet change notifications
pub type FacetCallback = Arc<dyn Fn(FacetChange) + Send + Sync>;

/// Callback for stream samples
pub type SampleCallback = Arc<dyn Fn(StreamSample) + Send + Sync>;

/// An on-demand sample stream created by the device.
///
/// A disabled stream produces no samples. Flipping the flag must not block
/// and must not invoke the sample callback on the calling thread.
pub trait DataStream: Send + Sync {
    fn kind(&self) -> StreamKind;

    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;
}

/// Eye-tracking device host.
///
/// Callbacks run on device-owned threads and may be invoked concurrently
/// with any other call.
pub trait DeviceHost: Send + Sync {
    /// Whether the eye-tracking engine can be used at all
    fn availability(&self) -> Availability;

    /// Register a callback for all facet change notifications
    fn watch_states(&self, callback: FacetCallback);

    /// Create a stream of `kind`, enabled, delivering samples to `callback`
    fn create_stream(&self, kind: StreamKind, callback: SampleCallback)
        -> Result<Box<dyn DataStream>>;
}
