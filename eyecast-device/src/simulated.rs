//! Software eye-tracking device
//!
//! Behaves like a real host from the broadcaster's point of view: facet
//! notifications arrive through registered watchers, and samples only flow
//! through streams that exist and are enabled. Samples can be pushed by hand
//! with [`SimulatedHost::emit`] or produced by a background generator thread.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::{DeviceError, Result};
use crate::host::{DataStream, DeviceHost, FacetCallback, SampleCallback};
use crate::models::{
    Availability, EyePositionData, EyeTrackingDeviceStatus, FacetChange, GazePointData,
    GazeTracking, HeadPoseData, HeadRotationFlags, Rectangle, Size, StreamKind, StreamSample,
    UserPresence, Vector3,
};

/// Lifecycle counters for the streams of one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStats {
    /// Streams created
    pub created: u32,
    /// disabled → enabled flips (creation not included)
    pub enables: u32,
    /// enabled → disabled flips
    pub disables: u32,
}

#[derive(Default)]
struct Counters {
    created: AtomicU32,
    enables: AtomicU32,
    disables: AtomicU32,
}

struct SimulatedStream {
    kind: StreamKind,
    enabled: AtomicBool,
    callback: SampleCallback,
    counters: Arc<Counters>,
}

impl DataStream for Arc<SimulatedStream> {
    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was == enabled {
            return;
        }
        if enabled {
            self.counters.enables.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.disables.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!("Simulated {} stream enabled={}", self.kind, enabled);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

struct Inner {
    availability: RwLock<Availability>,
    watchers: RwLock<Vec<FacetCallback>>,
    streams: [RwLock<Vec<Arc<SimulatedStream>>>; 3],
    counters: [Arc<Counters>; 3],
    refuse_streams: AtomicBool,
}

/// Simulated eye-tracking host
#[derive(Clone)]
pub struct SimulatedHost {
    inner: Arc<Inner>,
}

impl SimulatedHost {
    /// Create an available host with no streams
    pub fn new() -> Self {
        Self::with_availability(Availability::Available)
    }

    pub fn with_availability(availability: Availability) -> Self {
        Self {
            inner: Arc::new(Inner {
                availability: RwLock::new(availability),
                watchers: RwLock::new(Vec::new()),
                streams: Default::default(),
                counters: Default::default(),
                refuse_streams: AtomicBool::new(false),
            }),
        }
    }

    pub fn set_availability(&self, availability: Availability) {
        *self.inner.availability.write() = availability;
    }

    /// Make subsequent `create_stream` calls fail
    pub fn refuse_streams(&self, refuse: bool) {
        self.inner.refuse_streams.store(refuse, Ordering::SeqCst);
    }

    /// Deliver a facet change to every watcher
    pub fn notify(&self, change: FacetChange) {
        // Clone so watchers can register new watchers without deadlocking
        let watchers = self.inner.watchers.read().clone();
        tracing::debug!("Simulated facet change: {}", change.facet_name());
        for watcher in watchers {
            watcher(change.clone());
        }
    }

    pub fn set_user_presence(&self, presence: UserPresence) {
        self.notify(FacetChange::UserPresence(presence));
    }

    pub fn set_user_profile_name(&self, name: Option<String>) {
        self.notify(FacetChange::UserProfileName(name));
    }

    pub fn set_device_status(&self, status: EyeTrackingDeviceStatus) {
        self.notify(FacetChange::EyeTrackingDeviceStatus(status));
    }

    pub fn set_gaze_tracking(&self, tracking: GazeTracking) {
        self.notify(FacetChange::GazeTracking(tracking));
    }

    pub fn set_screen_bounds(&self, bounds: Rectangle) {
        self.notify(FacetChange::ScreenBounds(bounds));
    }

    pub fn set_display_size(&self, size: Size) {
        self.notify(FacetChange::DisplaySize(size));
    }

    /// Report the facets a connected tracker with a user in front of it
    /// would report.
    pub fn announce_tracking(&self) {
        self.set_device_status(EyeTrackingDeviceStatus::Tracking);
        self.set_user_profile_name(Some("Default".to_string()));
        self.set_screen_bounds(Rectangle {
            x: 0.0,
            y: 0.0,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
        });
        self.set_display_size(Size {
            width: 527.0,
            height: 296.0,
        });
        self.set_user_presence(UserPresence::Present);
        self.set_gaze_tracking(GazeTracking::GazeTracked);
    }

    /// Push a sample through every enabled stream of its kind.
    ///
    /// Returns the number of streams that delivered it.
    pub fn emit(&self, sample: StreamSample) -> usize {
        let streams = self.inner.streams[sample.kind().index()].read().clone();
        let mut delivered = 0;
        for stream in streams.iter().filter(|s| s.is_enabled()) {
            (stream.callback)(sample);
            delivered += 1;
        }
        delivered
    }

    /// Whether a stream of `kind` exists and is enabled
    pub fn is_streaming(&self, kind: StreamKind) -> bool {
        self.inner.streams[kind.index()]
            .read()
            .iter()
            .any(|s| s.is_enabled())
    }

    pub fn stream_stats(&self, kind: StreamKind) -> StreamStats {
        let counters = &self.inner.counters[kind.index()];
        StreamStats {
            created: counters.created.load(Ordering::Relaxed),
            enables: counters.enables.load(Ordering::Relaxed),
            disables: counters.disables.load(Ordering::Relaxed),
        }
    }

    /// Start a thread emitting synthetic samples at `rate_hz` for every
    /// enabled stream. The thread stops when the guard is dropped.
    pub fn spawn_generator(&self, rate_hz: f64) -> Result<GeneratorGuard> {
        if !(rate_hz.is_finite() && rate_hz > 0.0) {
            return Err(DeviceError::Generator(format!("invalid sample rate {}", rate_hz)));
        }

        let period = Duration::try_from_secs_f64(1.0 / rate_hz)
            .map_err(|e| DeviceError::Generator(format!("invalid sample rate {}: {}", rate_hz, e)))?;
        let (stop, stopped) = mpsc::channel::<()>();
        let host = self.clone();

        let handle = std::thread::Builder::new()
            .name("eyecast-sim".to_string())
            .spawn(move || {
                let started = Instant::now();
                tracing::info!("Simulated sample generator running at {:.1} Hz", rate_hz);
                loop {
                    let t = started.elapsed().as_secs_f64();
                    for sample in synthetic_samples(t) {
                        host.emit(sample);
                    }
                    // Returns early once the guard hangs up
                    match stopped.recv_timeout(period) {
                        Err(mpsc::RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                tracing::info!("Simulated sample generator stopped");
            })
            .map_err(|e| DeviceError::Generator(e.to_string()))?;

        Ok(GeneratorGuard {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceHost for SimulatedHost {
    fn availability(&self) -> Availability {
        *self.inner.availability.read()
    }

    fn watch_states(&self, callback: FacetCallback) {
        self.inner.watchers.write().push(callback);
    }

    fn create_stream(
        &self,
        kind: StreamKind,
        callback: SampleCallback,
    ) -> Result<Box<dyn DataStream>> {
        if self.inner.refuse_streams.load(Ordering::SeqCst) {
            return Err(DeviceError::stream_creation(kind, "device refused stream"));
        }

        let counters = Arc::clone(&self.inner.counters[kind.index()]);
        counters.created.fetch_add(1, Ordering::Relaxed);

        let stream = Arc::new(SimulatedStream {
            kind,
            enabled: AtomicBool::new(true),
            callback,
            counters,
        });
        self.inner.streams[kind.index()].write().push(Arc::clone(&stream));
        tracing::debug!("Simulated {} stream created", kind);

        Ok(Box::new(stream))
    }
}

/// Stops the synthetic generator on drop
pub struct GeneratorGuard {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for GeneratorGuard {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

const SCREEN_WIDTH: f64 = 1920.0;
const SCREEN_HEIGHT: f64 = 1080.0;

/// Gaze wanders along a Lissajous curve, the head sways slowly.
fn synthetic_samples(t: f64) -> [StreamSample; 3] {
    let timestamp = t * 1000.0;

    let gaze = GazePointData {
        x: SCREEN_WIDTH / 2.0 + (SCREEN_WIDTH / 3.0) * (t * 0.7).sin(),
        y: SCREEN_HEIGHT / 2.0 + (SCREEN_HEIGHT / 3.0) * (t * 1.1).sin(),
        timestamp,
    };

    let sway = (t * 0.5).sin();
    let head = HeadPoseData {
        timestamp,
        head_position: Vector3 {
            x: 20.0 * sway,
            y: 10.0 * (t * 0.3).cos(),
            z: 600.0,
        },
        head_rotation: Vector3 {
            x: 0.05 * (t * 0.4).sin(),
            y: 0.1 * sway,
            z: 0.0,
        },
        has_head_position: true,
        has_rotation: HeadRotationFlags {
            has_rotation_x: true,
            has_rotation_y: true,
            has_rotation_z: true,
        },
    };

    let eye = |offset: f64| Vector3 {
        x: 20.0 * sway + offset,
        y: 10.0 * (t * 0.3).cos(),
        z: 600.0,
    };
    let normalized = |offset: f64| Vector3 {
        x: 0.5 + (20.0 * sway + offset) / 400.0,
        y: 0.5,
        z: 0.5,
    };
    let eyes = EyePositionData {
        timestamp,
        left_eye: eye(-32.0),
        left_eye_normalized: normalized(-32.0),
        right_eye: eye(32.0),
        right_eye_normalized: normalized(32.0),
        has_left_eye_position: true,
        has_right_eye_position: true,
    };

    [
        StreamSample::GazePoint(gaze),
        StreamSample::HeadPose(head),
        StreamSample::EyePosition(eyes),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn counting_callback() -> (SampleCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let callback: SampleCallback = Arc::new(move |_: StreamSample| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (callback, count)
    }

    fn gaze(x: f64) -> StreamSample {
        StreamSample::GazePoint(GazePointData { x, y: 0.0, timestamp: 0.0 })
    }

    #[test]
    fn test_emit_without_stream_delivers_nothing() {
        let host = SimulatedHost::new();
        assert_eq!(host.emit(gaze(1.0)), 0);
    }

    #[test]
    fn test_disabled_stream_delivers_nothing() {
        let host = SimulatedHost::new();
        let (callback, count) = counting_callback();
        let stream = host.create_stream(StreamKind::GazePoint, callback).unwrap();

        assert_eq!(host.emit(gaze(1.0)), 1);
        stream.set_enabled(false);
        assert_eq!(host.emit(gaze(2.0)), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!host.is_streaming(StreamKind::GazePoint));
    }

    #[test]
    fn test_stats_count_flips_only() {
        let host = SimulatedHost::new();
        let (callback, _) = counting_callback();
        let stream = host.create_stream(StreamKind::HeadPose, callback).unwrap();

        stream.set_enabled(true);
        stream.set_enabled(false);
        stream.set_enabled(false);
        stream.set_enabled(true);

        assert_eq!(
            host.stream_stats(StreamKind::HeadPose),
            StreamStats { created: 1, enables: 1, disables: 1 }
        );
        assert_eq!(host.stream_stats(StreamKind::GazePoint), StreamStats::default());
    }

    #[test]
    fn test_refused_stream() {
        let host = SimulatedHost::new();
        host.refuse_streams(true);
        let (callback, _) = counting_callback();
        let err = host.create_stream(StreamKind::EyePosition, callback).err().unwrap();
        assert!(matches!(err, DeviceError::StreamCreation { kind: StreamKind::EyePosition, .. }));
        assert_eq!(host.stream_stats(StreamKind::EyePosition).created, 0);
    }

    #[test]
    fn test_watchers_receive_changes() {
        let host = SimulatedHost::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        host.watch_states(Arc::new(move |change: FacetChange| s.lock().push(change)));

        host.set_user_presence(UserPresence::Present);
        host.set_user_profile_name(None);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], FacetChange::UserPresence(UserPresence::Present));
        assert_eq!(seen[1], FacetChange::UserProfileName(None));
    }

    #[test]
    fn test_generator_only_feeds_enabled_streams() {
        let host = SimulatedHost::new();
        let (gaze_cb, gaze_count) = counting_callback();
        let (head_cb, head_count) = counting_callback();
        let _gaze = host.create_stream(StreamKind::GazePoint, gaze_cb).unwrap();
        let head = host.create_stream(StreamKind::HeadPose, head_cb).unwrap();
        head.set_enabled(false);

        let guard = host.spawn_generator(500.0).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        drop(guard);

        assert!(gaze_count.load(Ordering::SeqCst) > 0);
        assert_eq!(head_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_generator_rejects_bad_rate() {
        let host = SimulatedHost::new();
        assert!(host.spawn_generator(0.0).is_err());
        assert!(host.spawn_generator(f64::NAN).is_err());
        assert!(host.spawn_generator(-5.0).is_err());
        // Period too long to represent
        assert!(matches!(host.spawn_generator(1e-30), Err(DeviceError::Generator(_))));
    }

    #[test]
    fn test_slow_generator_stops_promptly() {
        let host = SimulatedHost::new();
        let guard = host.spawn_generator(0.2).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        drop(guard);
        assert!(started.elapsed() < Duration::from_secs(1), "drop waited a full period");
    }

    #[test]
    fn test_availability() {
        let host = SimulatedHost::with_availability(Availability::NotRunning);
        assert_eq!(host.availability(), Availability::NotRunning);
        host.set_availability(Availability::Available);
        assert_eq!(host.availability(), Availability::Available);
    }
}
