//! Session-facing side of the bridge.
//!
//! Decoded envelopes end up as calls on a [`SessionSink`], the interface
//! the WebSocket gateway implements. Callbacks run synchronously on the
//! polling thread, in job order.

use bytes::Bytes;
use tracing::{debug, trace};

use crate::envelope::{ConnectionId, ConnectionState, DisconnectReason, Envelope};

/// Message body handed to [`SessionSink::on_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageData {
    Text(String),
    Binary(Bytes),
}

impl MessageData {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receiver of connection lifecycle events.
pub trait SessionSink {
    fn on_connected(&mut self, connection_id: &ConnectionId, data: Bytes);

    fn on_message(&mut self, connection_id: &ConnectionId, data: MessageData);

    fn on_disconnected(&mut self, connection_id: &ConnectionId, data: Bytes, reason: DisconnectReason);
}

impl<T: SessionSink + ?Sized> SessionSink for &mut T {
    fn on_connected(&mut self, connection_id: &ConnectionId, data: Bytes) {
        (**self).on_connected(connection_id, data);
    }

    fn on_message(&mut self, connection_id: &ConnectionId, data: MessageData) {
        (**self).on_message(connection_id, data);
    }

    fn on_disconnected(&mut self, connection_id: &ConnectionId, data: Bytes, reason: DisconnectReason) {
        (**self).on_disconnected(connection_id, data, reason);
    }
}

impl<T: SessionSink + ?Sized> SessionSink for Box<T> {
    fn on_connected(&mut self, connection_id: &ConnectionId, data: Bytes) {
        (**self).on_connected(connection_id, data);
    }

    fn on_message(&mut self, connection_id: &ConnectionId, data: MessageData) {
        (**self).on_message(connection_id, data);
    }

    fn on_disconnected(&mut self, connection_id: &ConnectionId, data: Bytes, reason: DisconnectReason) {
        (**self).on_disconnected(connection_id, data, reason);
    }
}

/// Owned form of one sink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected {
        connection_id: ConnectionId,
        data: Bytes,
    },
    Message {
        connection_id: ConnectionId,
        data: MessageData,
    },
    Disconnected {
        connection_id: ConnectionId,
        data: Bytes,
        reason: DisconnectReason,
    },
}

impl SessionEvent {
    #[must_use]
    pub const fn connection_id(&self) -> &ConnectionId {
        match self {
            Self::Connected { connection_id, .. }
            | Self::Message { connection_id, .. }
            | Self::Disconnected { connection_id, .. } => connection_id,
        }
    }
}

/// Collects every sink call as a [`SessionEvent`].
impl SessionSink for Vec<SessionEvent> {
    fn on_connected(&mut self, connection_id: &ConnectionId, data: Bytes) {
        self.push(SessionEvent::Connected {
            connection_id: *connection_id,
            data,
        });
    }

    fn on_message(&mut self, connection_id: &ConnectionId, data: MessageData) {
        self.push(SessionEvent::Message {
            connection_id: *connection_id,
            data,
        });
    }

    fn on_disconnected(&mut self, connection_id: &ConnectionId, data: Bytes, reason: DisconnectReason) {
        self.push(SessionEvent::Disconnected {
            connection_id: *connection_id,
            data,
            reason,
        });
    }
}

/// Forwards sink calls into a flume channel.
///
/// Lets a gateway running on another thread consume events while the
/// poller stays on the host thread. Events are dropped once every receiver
/// is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: flume::Sender<SessionEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its unbounded channel.
    #[must_use]
    pub fn unbounded() -> (Self, flume::Receiver<SessionEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    #[must_use]
    pub const fn new(tx: flume::Sender<SessionEvent>) -> Self {
        Self { tx }
    }

    fn forward(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            trace!("[SESSION] Receiver gone, event dropped");
        }
    }
}

impl SessionSink for ChannelSink {
    fn on_connected(&mut self, connection_id: &ConnectionId, data: Bytes) {
        self.forward(SessionEvent::Connected {
            connection_id: *connection_id,
            data,
        });
    }

    fn on_message(&mut self, connection_id: &ConnectionId, data: MessageData) {
        self.forward(SessionEvent::Message {
            connection_id: *connection_id,
            data,
        });
    }

    fn on_disconnected(&mut self, connection_id: &ConnectionId, data: Bytes, reason: DisconnectReason) {
        self.forward(SessionEvent::Disconnected {
            connection_id: *connection_id,
            data,
            reason,
        });
    }
}

/// Route one envelope to the matching sink callback.
///
/// Returns `false` when the state is not one the sink understands; nothing
/// is called in that case.
pub fn dispatch<K: SessionSink + ?Sized>(envelope: Envelope, sink: &mut K) -> bool {
    let Envelope {
        state,
        connection_id,
        payload,
        ..
    } = envelope;

    match state {
        ConnectionState::Connect => sink.on_connected(&connection_id, payload),
        ConnectionState::StringMessage => {
            let text = String::from_utf8_lossy(&payload).into_owned();
            sink.on_message(&connection_id, MessageData::Text(text));
        }
        ConnectionState::BinaryMessage => {
            sink.on_message(&connection_id, MessageData::Binary(payload));
        }
        ConnectionState::DisconnectIntentional
        | ConnectionState::DisconnectAccidental
        | ConnectionState::DisconnectAckFailed
        | ConnectionState::DisconnectSendFailed => {
            if let Some(reason) = state.disconnect_reason() {
                sink.on_disconnected(&connection_id, payload, reason);
            }
        }
        ConnectionState::Unrecognized(marker) => {
            debug!(
                connection = %connection_id,
                state = marker,
                "[ENVELOPE] Unrecognized state, not dispatched"
            );
            return false;
        }
    }
    true
}
