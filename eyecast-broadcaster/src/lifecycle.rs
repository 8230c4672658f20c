//! Connection lifecycle and inbound command dispatch
//!
//! Transport agnostic: the WebSocket server calls these handlers, and so can
//! tests or any other transport.

use eyecast_device::{DeviceHost, StreamKind, StreamSample};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::broadcaster::BroadcastEngine;
use crate::client::{ClientSet, Connection};
use crate::commands::ClientCommand;
use crate::state::DeviceStateTracker;
use crate::streams::{StreamRegistry, StreamStatus};
use crate::subscriptions::{SubscriberTable, SubscriptionManager};

pub struct ConnectionLifecycle {
    host: Arc<dyn DeviceHost>,
    clients: Arc<ClientSet>,
    state: DeviceStateTracker,
    engine: Arc<BroadcastEngine>,
    subscriptions: SubscriptionManager,
    attached: AtomicBool,
}

impl ConnectionLifecycle {
    /// Wire the state tracker, stream registry, subscription manager and
    /// broadcast engine around `host`.
    pub fn new(host: Arc<dyn DeviceHost>) -> Self {
        let clients = Arc::new(ClientSet::new());
        let subscribers = Arc::new(SubscriberTable::new());
        let state = DeviceStateTracker::new();
        let engine = Arc::new(BroadcastEngine::new(
            Arc::clone(&clients),
            Arc::clone(&subscribers),
            state.clone(),
        ));

        let sink_engine = Arc::clone(&engine);
        let streams = StreamRegistry::new(
            Arc::clone(&host),
            Arc::new(move |sample: StreamSample| {
                sink_engine.broadcast_event(sample);
            }),
        );
        let subscriptions = SubscriptionManager::new(Arc::clone(&clients), subscribers, streams);

        Self {
            host,
            clients,
            state,
            engine,
            subscriptions,
            attached: AtomicBool::new(false),
        }
    }

    /// Start listening to device facet notifications. Each change is
    /// broadcast as a full state to every connection. Calling again is a
    /// no-op.
    pub fn start(&self) {
        if self.attached.swap(true, Ordering::SeqCst) {
            return;
        }
        let engine = Arc::clone(&self.engine);
        self.state.attach(self.host.as_ref(), move |snapshot| {
            engine.broadcast_snapshot(snapshot);
        });
        tracing::debug!("Listening for device state changes");
    }

    /// New connection: register it and send it the current state
    pub fn on_connect(&self, connection: Arc<Connection>) {
        if !connection.mark_open() {
            tracing::warn!("{} is not connecting, refusing to open it", connection.id());
            return;
        }
        self.clients.insert(Arc::clone(&connection));
        match connection.peer() {
            Some(peer) => tracing::info!(
                "{} connected from {}. Total clients: {}",
                connection.id(),
                peer,
                self.clients.len()
            ),
            None => tracing::info!(
                "{} connected. Total clients: {}",
                connection.id(),
                self.clients.len()
            ),
        }
        self.engine.send_state(&connection);
    }

    /// Connection gone: remove it everywhere. Safe to call more than once.
    pub fn on_disconnect(&self, connection: &Connection) {
        let id = connection.id();
        let was_member = self.clients.remove(id).is_some();
        self.subscriptions.unsubscribe_all(id);
        if connection.mark_closed() && was_member {
            tracing::info!("{} disconnected. Total clients: {}", id, self.clients.len());
        }
    }

    pub fn on_error(&self, connection: &Connection, error: &dyn Display) {
        tracing::warn!("{} had error: {}", connection.id(), error);
    }

    /// Text frame from a client. Unknown commands are ignored.
    pub fn on_message(&self, connection: &Arc<Connection>, text: &str) {
        if !connection.is_open() {
            tracing::debug!("Dropping message from {} (not open)", connection.id());
            return;
        }

        match ClientCommand::parse(text) {
            Some(command) => self.dispatch(connection, command),
            None => tracing::debug!("Ignoring unknown command from {}", connection.id()),
        }
    }

    fn dispatch(&self, connection: &Arc<Connection>, command: ClientCommand) {
        match command {
            ClientCommand::State => {
                self.engine.send_state(connection);
            }
            ClientCommand::Start(kind) => {
                if let Err(e) = self.subscriptions.subscribe(connection, kind) {
                    tracing::warn!("Failed to start {} stream for {}: {}", kind, connection.id(), e);
                }
            }
            ClientCommand::Stop(kind) => self.subscriptions.unsubscribe(connection.id(), kind),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    pub fn subscriber_count(&self, kind: StreamKind) -> usize {
        self.subscriptions.subscriber_count(kind)
    }

    pub fn stream_status(&self, kind: StreamKind) -> StreamStatus {
        self.subscriptions.stream_status(kind)
    }

    pub fn state(&self) -> &DeviceStateTracker {
        &self.state
    }
}
