//! Lazily created device streams
//!
//! Each stream kind is created on the first request to enable it and then
//! only toggled; it is never recreated.

use eyecast_device::{DataStream, DeviceHost, SampleCallback, StreamKind};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::Result;

/// Observable state of a stream slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Uninitialized,
    Enabled,
    Disabled,
}

enum StreamHandle {
    Uninitialized,
    Enabled(Box<dyn DataStream>),
    Disabled(Box<dyn DataStream>),
}

impl StreamHandle {
    fn status(&self) -> StreamStatus {
        match self {
            StreamHandle::Uninitialized => StreamStatus::Uninitialized,
            StreamHandle::Enabled(_) => StreamStatus::Enabled,
            StreamHandle::Disabled(_) => StreamStatus::Disabled,
        }
    }
}

/// Owner of the device's sample streams, one slot per kind
pub struct StreamRegistry {
    host: Arc<dyn DeviceHost>,
    sink: SampleCallback,
    slots: [Mutex<StreamHandle>; 3],
}

impl StreamRegistry {
    /// `sink` receives every sample of every stream created later
    pub fn new(host: Arc<dyn DeviceHost>, sink: SampleCallback) -> Self {
        Self {
            host,
            sink,
            slots: [
                Mutex::new(StreamHandle::Uninitialized),
                Mutex::new(StreamHandle::Uninitialized),
                Mutex::new(StreamHandle::Uninitialized),
            ],
        }
    }

    /// Create the stream on first use, re-enable it if disabled, otherwise
    /// do nothing.
    pub fn ensure_enabled(&self, kind: StreamKind) -> Result<()> {
        let mut slot = self.slots[kind.index()].lock();
        let next = match std::mem::replace(&mut *slot, StreamHandle::Uninitialized) {
            StreamHandle::Uninitialized => {
                let stream = self.host.create_stream(kind, Arc::clone(&self.sink))?;
                if !stream.is_enabled() {
                    stream.set_enabled(true);
                }
                tracing::info!("Created {} stream", kind);
                StreamHandle::Enabled(stream)
            }
            StreamHandle::Disabled(stream) => {
                stream.set_enabled(true);
                tracing::info!("Enabled {} stream", kind);
                StreamHandle::Enabled(stream)
            }
            enabled @ StreamHandle::Enabled(_) => enabled,
        };
        *slot = next;
        Ok(())
    }

    /// Disable the stream if it is running. Never creates one.
    pub fn disable(&self, kind: StreamKind) {
        let mut slot = self.slots[kind.index()].lock();
        let next = match std::mem::replace(&mut *slot, StreamHandle::Uninitialized) {
            StreamHandle::Enabled(stream) => {
                stream.set_enabled(false);
                tracing::info!("Disabled {} stream", kind);
                StreamHandle::Disabled(stream)
            }
            other => other,
        };
        *slot = next;
    }

    pub fn status(&self, kind: StreamKind) -> StreamStatus {
        self.slots[kind.index()].lock().status()
    }
}
