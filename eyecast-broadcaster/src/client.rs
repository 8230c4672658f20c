use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Utf8Bytes;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Why a message could not be queued for a connection
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    #[error("outbound queue full")]
    QueueFull,

    #[error("connection gone")]
    Disconnected,
}

/// One client session.
///
/// Outbound messages go through a bounded queue drained by the transport's
/// writer task, so sending never waits on the network. Payloads are shared
/// buffers; queueing one for many connections does not copy it.
pub struct Connection {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    state: Mutex<ConnectionState>,
    tx: mpsc::Sender<Utf8Bytes>,
    dropped_messages: AtomicU64,
}

impl Connection {
    pub fn new(peer: Option<SocketAddr>, tx: mpsc::Sender<Utf8Bytes>) -> Self {
        Self {
            id: ConnectionId::next(),
            peer,
            state: Mutex::new(ConnectionState::Connecting),
            tx,
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Create a connection together with the receiving end of its queue
    pub fn channel(
        peer: Option<SocketAddr>,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Utf8Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Arc::new(Self::new(peer, tx)), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Connecting -> Open. Returns false if the connection was not connecting.
    pub(crate) fn mark_open(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ConnectionState::Connecting {
            *state = ConnectionState::Open;
            true
        } else {
            false
        }
    }

    /// Any -> Closed. Returns false if already closed.
    pub(crate) fn mark_closed(&self) -> bool {
        let mut state = self.state.lock();
        let was_closed = *state == ConnectionState::Closed;
        *state = ConnectionState::Closed;
        !was_closed
    }

    /// Queue a text frame without waiting
    pub fn send(&self, message: Utf8Bytes) -> Result<(), SendFailure> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                Err(SendFailure::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SendFailure::Disconnected),
        }
    }

    /// Messages dropped because the queue was full
    pub fn dropped_messages(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("state", &self.state())
            .finish()
    }
}

/// Thread-safe set of connections keyed by id
#[derive(Default)]
pub struct ClientSet {
    clients: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
}

impl ClientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the connection was not present
    pub fn insert(&self, connection: Arc<Connection>) -> bool {
        self.clients
            .write()
            .insert(connection.id(), connection)
            .is_none()
    }

    pub fn remove(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.clients.write().remove(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.clients.read().contains_key(&id)
    }

    /// Copy of the current members, for iteration without holding the lock
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.clients.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}
