use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tracing::debug;

/// Signaling errors. None of these are ever reported back to a client.
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("invalid message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("join requires a non-empty roomId and userId")]
    InvalidJoin,

    #[error("sender has not joined a room")]
    NotInRoom,

    #[error("message has no targetId")]
    MissingTarget,

    #[error("peer {target} not found in room {room}")]
    TargetNotFound { room: RoomId, target: PeerId },

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Room identifier chosen by the client
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Peer identity, unique within a room only by convention
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of an accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Wrapper for outbound WebSocket messages using tungstenite's Utf8Bytes.
#[derive(Debug, Clone)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    /// Create a new outbound message from any string type
    pub fn new(s: impl Into<Utf8Bytes>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}

/// Routing reference to a connection, held by the directory.
///
/// The handle only feeds the connection's outbound queue; it cannot close
/// the connection.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    pub conn: ConnectionId,
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl PeerHandle {
    pub fn new(conn: ConnectionId, tx: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self { conn, tx }
    }

    /// Best-effort send. Returns false if the connection is already gone.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if self.tx.send(msg).is_err() {
            debug!("Dropping message for closed {}", self.conn);
            return false;
        }
        true
    }
}

#[derive(Debug, Default)]
pub(crate) struct Room {
    pub peers: HashMap<PeerId, PeerHandle>,
}
