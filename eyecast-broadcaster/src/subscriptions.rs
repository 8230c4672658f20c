//! Per-stream subscriber sets
//!
//! Membership changes and the stream enable/disable they cause happen under
//! one lock per kind, so racing subscribe/unsubscribe calls from different
//! connections always leave the device stream running iff the set is
//! non-empty.

use eyecast_device::StreamKind;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::client::{ClientSet, Connection, ConnectionId};
use crate::error::Result;
use crate::streams::{StreamRegistry, StreamStatus};

/// Subscriber set of every stream kind
#[derive(Default)]
pub struct SubscriberTable {
    sets: [ClientSet; 3],
}

impl SubscriberTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, kind: StreamKind) -> &ClientSet {
        &self.sets[kind.index()]
    }

    /// Current subscribers of `kind`
    pub fn snapshot(&self, kind: StreamKind) -> Vec<Arc<Connection>> {
        self.set(kind).snapshot()
    }
}

pub struct SubscriptionManager {
    clients: Arc<ClientSet>,
    table: Arc<SubscriberTable>,
    streams: StreamRegistry,
    transitions: [Mutex<()>; 3],
}

impl SubscriptionManager {
    /// `clients` is the global connection set; only its members can subscribe.
    pub fn new(
        clients: Arc<ClientSet>,
        table: Arc<SubscriberTable>,
        streams: StreamRegistry,
    ) -> Self {
        Self {
            clients,
            table,
            streams,
            transitions: Default::default(),
        }
    }

    /// Add `connection` to the subscribers of `kind` and make sure the
    /// stream runs. Subscribing twice is harmless.
    ///
    /// A stream activation error is returned, but the subscription stays:
    /// a later subscribe retries the activation.
    pub fn subscribe(&self, connection: &Arc<Connection>, kind: StreamKind) -> Result<()> {
        let _transition = self.transitions[kind.index()].lock();

        if !self.clients.contains(connection.id()) {
            tracing::debug!("Ignoring {} subscribe from departed {}", kind, connection.id());
            return Ok(());
        }

        let set = self.table.set(kind);
        if set.insert(Arc::clone(connection)) {
            tracing::debug!(
                "{} subscribed to {}. Subscribers: {}",
                connection.id(),
                kind,
                set.len()
            );
        }

        self.streams.ensure_enabled(kind)
    }

    /// Remove `connection` from the subscribers of `kind`; stop the stream
    /// once nobody is left.
    pub fn unsubscribe(&self, id: ConnectionId, kind: StreamKind) {
        let _transition = self.transitions[kind.index()].lock();

        let set = self.table.set(kind);
        if set.remove(id).is_some() {
            tracing::debug!("{} unsubscribed from {}. Subscribers: {}", id, kind, set.len());
        }

        if set.is_empty() {
            self.streams.disable(kind);
        }
    }

    /// Remove `connection` from every subscriber set
    pub fn unsubscribe_all(&self, id: ConnectionId) {
        for kind in StreamKind::ALL {
            self.unsubscribe(id, kind);
        }
    }

    pub fn subscriber_count(&self, kind: StreamKind) -> usize {
        self.table.set(kind).len()
    }

    pub fn is_subscribed(&self, id: ConnectionId, kind: StreamKind) -> bool {
        self.table.set(kind).contains(id)
    }

    pub fn stream_status(&self, kind: StreamKind) -> StreamStatus {
        self.streams.status(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyecast_device::{SimulatedHost, StreamSample, StreamStats};
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::Utf8Bytes;

    struct Fixture {
        host: SimulatedHost,
        clients: Arc<ClientSet>,
        manager: SubscriptionManager,
    }

    fn fixture() -> Fixture {
        let host = SimulatedHost::new();
        let clients = Arc::new(ClientSet::new());
        let streams = StreamRegistry::new(Arc::new(host.clone()), Arc::new(|_: StreamSample| {}));
        let manager =
            SubscriptionManager::new(Arc::clone(&clients), Arc::new(SubscriberTable::new()), streams);
        Fixture { host, clients, manager }
    }

    fn join(clients: &ClientSet) -> (Arc<Connection>, mpsc::Receiver<Utf8Bytes>) {
        let (conn, rx) = Connection::channel(None, 8);
        clients.insert(Arc::clone(&conn));
        (conn, rx)
    }

    #[test]
    fn test_double_subscribe_is_one_membership() {
        let f = fixture();
        let (a, _ra) = join(&f.clients);

        f.manager.subscribe(&a, StreamKind::GazePoint).unwrap();
        f.manager.subscribe(&a, StreamKind::GazePoint).unwrap();

        assert_eq!(f.manager.subscriber_count(StreamKind::GazePoint), 1);
        assert_eq!(f.host.stream_stats(StreamKind::GazePoint).created, 1);
    }

    #[test]
    fn test_device_sees_only_boundary_crossings() {
        let f = fixture();
        let (a, _ra) = join(&f.clients);
        let (b, _rb) = join(&f.clients);
        let kind = StreamKind::HeadPose;

        f.manager.subscribe(&a, kind).unwrap(); // 0 -> 1
        f.manager.subscribe(&b, kind).unwrap();
        f.manager.unsubscribe(a.id(), kind);
        assert_eq!(f.manager.stream_status(kind), StreamStatus::Enabled);
        f.manager.unsubscribe(b.id(), kind); // 1 -> 0
        assert_eq!(f.manager.stream_status(kind), StreamStatus::Disabled);
        f.manager.unsubscribe(b.id(), kind);
        f.manager.subscribe(&a, kind).unwrap(); // 0 -> 1
        f.manager.subscribe(&b, kind).unwrap();
        f.manager.unsubscribe(b.id(), kind);

        assert_eq!(
            f.host.stream_stats(kind),
            StreamStats { created: 1, enables: 1, disables: 1 }
        );
        assert!(f.host.is_streaming(kind));
    }

    #[test]
    fn test_unsubscribe_unknown_never_creates_stream() {
        let f = fixture();
        let (a, _ra) = join(&f.clients);

        f.manager.unsubscribe(a.id(), StreamKind::EyePosition);
        assert_eq!(f.manager.stream_status(StreamKind::EyePosition), StreamStatus::Uninitialized);
    }

    #[test]
    fn test_unsubscribe_all_clears_every_kind() {
        let f = fixture();
        let (a, _ra) = join(&f.clients);
        let (b, _rb) = join(&f.clients);

        for kind in StreamKind::ALL {
            f.manager.subscribe(&a, kind).unwrap();
        }
        f.manager.subscribe(&b, StreamKind::GazePoint).unwrap();

        f.manager.unsubscribe_all(a.id());

        for kind in StreamKind::ALL {
            assert!(!f.manager.is_subscribed(a.id(), kind));
        }
        assert_eq!(f.manager.stream_status(StreamKind::GazePoint), StreamStatus::Enabled);
        assert_eq!(f.manager.stream_status(StreamKind::HeadPose), StreamStatus::Disabled);
        assert_eq!(f.manager.stream_status(StreamKind::EyePosition), StreamStatus::Disabled);
    }

    #[test]
    fn test_departed_connection_cannot_subscribe() {
        let f = fixture();
        let (ghost, _rx) = Connection::channel(None, 8);

        f.manager.subscribe(&ghost, StreamKind::GazePoint).unwrap();

        assert_eq!(f.manager.subscriber_count(StreamKind::GazePoint), 0);
        assert_eq!(f.manager.stream_status(StreamKind::GazePoint), StreamStatus::Uninitialized);
    }

    #[test]
    fn test_activation_failure_keeps_subscription() {
        let f = fixture();
        let (a, _ra) = join(&f.clients);

        f.host.refuse_streams(true);
        assert!(f.manager.subscribe(&a, StreamKind::GazePoint).is_err());
        assert!(f.manager.is_subscribed(a.id(), StreamKind::GazePoint));

        f.host.refuse_streams(false);
        f.manager.subscribe(&a, StreamKind::GazePoint).unwrap();
        assert_eq!(f.manager.stream_status(StreamKind::GazePoint), StreamStatus::Enabled);
    }

    #[test]
    fn test_concurrent_churn_ends_consistent() {
        let f = Arc::new(fixture());
        let kind = StreamKind::GazePoint;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let f = Arc::clone(&f);
                std::thread::spawn(move || {
                    let (conn, _rx) = join(&f.clients);
                    for _ in 0..200 {
                        f.manager.subscribe(&conn, kind).unwrap();
                        f.manager.unsubscribe(conn.id(), kind);
                    }
                    conn
                })
            })
            .collect();
        let conns: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(f.manager.subscriber_count(kind), 0);
        assert!(!f.host.is_streaming(kind));

        f.manager.subscribe(&conns[0], kind).unwrap();
        assert!(f.host.is_streaming(kind));
        let stats = f.host.stream_stats(kind);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.enables, stats.disables);
    }
}
