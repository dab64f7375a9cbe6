use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{error, info};

use super::messages::ServerMessage;
use super::types::{ConnectionId, PeerHandle, PeerId, Room, RoomId};

/// Shared room membership table.
///
/// Each room lives in its own map entry; a mutation and the notification
/// it triggers run while holding that entry, so members of one room see
/// joins and leaves in a single order while other rooms proceed
/// independently. Cloning the directory yields another handle to the same
/// table.
#[derive(Clone, Default)]
pub struct RoomDirectory {
    rooms: Arc<DashMap<RoomId, Room>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `peer_id` into `room_id`, creating the room if needed, and
    /// notify the other members with `peer-joined`.
    ///
    /// An existing entry under the same id is overwritten; its connection
    /// is left open. Returns the members that were notified.
    pub fn join(&self, room_id: &RoomId, peer_id: &PeerId, handle: PeerHandle) -> Vec<PeerId> {
        let mut room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!("Room created: {}", room_id);
            Room::default()
        });

        if let Some(previous) = room.peers.insert(peer_id.clone(), handle) {
            info!(
                "Peer {} in room {} rebound from {}",
                peer_id, room_id, previous.conn
            );
        }

        let notice = ServerMessage::PeerJoined {
            user_id: peer_id.clone(),
            room_id: room_id.clone(),
        };
        let others = broadcast(&room, &notice, Some(peer_id));

        info!("Peer {} joined room {} ({} others)", peer_id, room_id, others.len());
        others
    }

    /// Remove `peer_id` from `room_id` if the entry belongs to `conn`, then
    /// notify the remaining members with `peer-left`. The room is dropped
    /// once empty.
    ///
    /// Returns false when nothing was removed: unknown room, unknown peer,
    /// or an entry that has since been taken over by another connection.
    pub fn leave(&self, room_id: &RoomId, peer_id: &PeerId, conn: ConnectionId) -> bool {
        let Entry::Occupied(mut entry) = self.rooms.entry(room_id.clone()) else {
            return false;
        };

        let room = entry.get_mut();
        let owned = room.peers.get(peer_id).is_some_and(|h| h.conn == conn);
        if !owned {
            return false;
        }
        room.peers.remove(peer_id);

        let notice = ServerMessage::PeerLeft {
            user_id: peer_id.clone(),
            room_id: room_id.clone(),
        };
        broadcast(room, &notice, None);
        info!("Peer {} left room {}", peer_id, room_id);

        if room.peers.is_empty() {
            entry.remove();
            info!("Room {} removed (empty)", room_id);
        }
        true
    }

    /// Resolve a forward target within a room
    pub fn lookup(&self, room_id: &RoomId, peer_id: &PeerId) -> Option<PeerHandle> {
        self.rooms
            .get(room_id)
            .and_then(|room| room.peers.get(peer_id).cloned())
    }

    /// Current members of a room, optionally excluding one peer. Uses the
    /// same selection as the join and leave fan-out.
    pub fn members(&self, room_id: &RoomId, except: Option<&PeerId>) -> BTreeSet<PeerId> {
        self.rooms
            .get(room_id)
            .map(|room| recipients(&room, except).map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn member_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.peers.len())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Members of `room` other than `except`
fn recipients<'a>(
    room: &'a Room,
    except: Option<&'a PeerId>,
) -> impl Iterator<Item = (&'a PeerId, &'a PeerHandle)> {
    room.peers.iter().filter(move |(id, _)| Some(*id) != except)
}

/// Fan `msg` out to every member except `skip` and return who was sent it.
/// A failed send to one member does not affect the rest.
fn broadcast(room: &Room, msg: &ServerMessage, skip: Option<&PeerId>) -> Vec<PeerId> {
    let encoded = match msg.encode() {
        Ok(m) => m,
        Err(e) => {
            error!("Dropping notification: {}", e);
            return Vec::new();
        }
    };

    recipients(room, skip)
        .map(|(id, peer)| {
            peer.send(encoded.clone());
            id.clone()
        })
        .collect()
}
