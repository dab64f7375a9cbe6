use std::net::SocketAddr;

use tokio::sync::mpsc;
use tracing::debug;

use super::directory::RoomDirectory;
use super::types::{ConnectionId, OutboundMessage, PeerHandle, PeerId, RoomId};

/// Room membership held by a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room_id: RoomId,
    pub peer_id: PeerId,
}

/// Per-connection state owned by the connection's receive task.
///
/// Outbound frames go through an unbounded queue; the directory only ever
/// sees a [`PeerHandle`] onto that queue. Dropping the connection runs
/// [`Connection::cleanup`].
pub struct Connection {
    id: ConnectionId,
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<OutboundMessage>,
    membership: Option<Membership>,
    directory: RoomDirectory,
}

impl Connection {
    /// Create a connection and the receiver its send task drains
    pub fn new(
        addr: SocketAddr,
        directory: RoomDirectory,
    ) -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Self {
            id: ConnectionId::next(),
            addr,
            tx,
            membership: None,
            directory,
        };
        (conn, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn membership(&self) -> Option<&Membership> {
        self.membership.as_ref()
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    pub fn handle(&self) -> PeerHandle {
        PeerHandle::new(self.id, self.tx.clone())
    }

    /// Record membership after a successful join. Any previous membership
    /// must have been cleaned up first.
    pub(crate) fn set_membership(&mut self, membership: Membership) {
        debug_assert!(self.membership.is_none());
        self.membership = Some(membership);
    }

    /// Leave the current room, if any, notifying the remaining members.
    ///
    /// Safe to call any number of times; only the first call after a join
    /// touches the directory.
    pub fn cleanup(&mut self) {
        let Some(Membership { room_id, peer_id }) = self.membership.take() else {
            return;
        };

        if !self.directory.leave(&room_id, &peer_id, self.id) {
            debug!(
                "{} ({}) no longer owns {} in room {}",
                self.id, self.addr, peer_id, room_id
            );
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cleanup();
    }
}
