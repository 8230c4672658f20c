//! Last known device state
//!
//! Facet notifications arrive on device threads. Each one replaces a single
//! facet and is followed by a full-state callback; updates and callbacks are
//! serialized so clients observe snapshots in the order they were produced.

use eyecast_device::{DeviceHost, DeviceState, FacetChange};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Shared handle to the device state record
#[derive(Clone, Default)]
pub struct DeviceStateTracker {
    state: Arc<RwLock<DeviceState>>,
    publish: Arc<Mutex<()>>,
}

impl DeviceStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of every facet
    pub fn snapshot(&self) -> DeviceState {
        self.state.read().clone()
    }

    /// Replace one facet, returning the state right after the update
    pub fn apply(&self, change: FacetChange) -> DeviceState {
        let mut state = self.state.write();
        state.apply(change);
        state.clone()
    }

    /// Run `f` on the current state while no facet change can be applied or
    /// published. `f` must not block.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        let _ordered = self.publish.lock();
        let snapshot = self.snapshot();
        f(&snapshot)
    }

    /// Subscribe to the device's facet notifications.
    ///
    /// `on_change` runs on the notifying thread with the full state after
    /// each change. It must not block.
    pub fn attach<F>(&self, host: &dyn DeviceHost, on_change: F)
    where
        F: Fn(&DeviceState) + Send + Sync + 'static,
    {
        let tracker = self.clone();
        host.watch_states(Arc::new(move |change: FacetChange| {
            tracker.handle_change(change, &on_change);
        }));
    }

    fn handle_change(&self, change: FacetChange, on_change: &dyn Fn(&DeviceState)) {
        let _ordered = self.publish.lock();
        let facet = change.facet_name();
        let snapshot = self.apply(change);
        tracing::debug!("Device state changed: {}", facet);
        on_change(&snapshot);
    }
}
