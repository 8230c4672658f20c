use eyecast_device::{DeviceState, StreamSample};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Utf8Bytes;

use crate::client::{ClientSet, Connection};
use crate::events::Envelope;
use crate::state::DeviceStateTracker;
use crate::subscriptions::SubscriberTable;

/// Serializes envelopes and fans them out to connections.
///
/// Recipients are snapshotted before sending and no lock is held while
/// queueing, so connections may come and go during a broadcast. A failed send
/// is logged and skipped; it never affects other recipients.
pub struct BroadcastEngine {
    clients: Arc<ClientSet>,
    subscribers: Arc<SubscriberTable>,
    state: DeviceStateTracker,
}

impl BroadcastEngine {
    pub fn new(
        clients: Arc<ClientSet>,
        subscribers: Arc<SubscriberTable>,
        state: DeviceStateTracker,
    ) -> Self {
        Self {
            clients,
            subscribers,
            state,
        }
    }

    /// Send the current device state to every connection
    pub fn broadcast_state(&self) -> usize {
        self.state.with_snapshot(|snapshot| self.broadcast_snapshot(snapshot))
    }

    /// Send the given device state to every connection
    pub fn broadcast_snapshot(&self, state: &DeviceState) -> usize {
        let envelope = Envelope::State(state.clone());
        self.deliver(&envelope, &self.clients.snapshot())
    }

    /// Send a stream sample to the subscribers of its kind
    pub fn broadcast_event(&self, sample: StreamSample) -> usize {
        let recipients = self.subscribers.snapshot(sample.kind());
        if recipients.is_empty() {
            return 0;
        }
        self.deliver(&Envelope::from(sample), &recipients)
    }

    /// Send the current device state to one connection. No facet broadcast
    /// can slip between the snapshot and the enqueue.
    pub fn send_state(&self, connection: &Arc<Connection>) -> bool {
        self.state.with_snapshot(|snapshot| {
            let envelope = Envelope::State(snapshot.clone());
            self.deliver(&envelope, std::slice::from_ref(connection)) == 1
        })
    }

    /// Returns the number of connections the envelope was queued for
    fn deliver(&self, envelope: &Envelope, recipients: &[Arc<Connection>]) -> usize {
        let json: Utf8Bytes = match envelope.to_json() {
            Ok(json) => Utf8Bytes::from(json),
            Err(e) => {
                tracing::error!("Failed to serialize {} envelope: {}", envelope.type_name(), e);
                return 0;
            }
        };

        let mut delivered = 0;
        for connection in recipients {
            match connection.send(json.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        "Failed to send {} to {}: {} (dropped so far: {})",
                        envelope.type_name(),
                        connection.id(),
                        e,
                        connection.dropped_messages()
                    );
                }
            }
        }

        tracing::trace!(
            "Broadcast {} to {}/{} connections",
            envelope.type_name(),
            delivered,
            recipients.len()
        );
        delivered
    }
}
