use tracing::{debug, info};

use super::connection::{Connection, Membership};
use super::messages::{ClientMessage, ServerMessage};
use super::types::{PeerId, RoomId, SignalingError};

/// What a dispatched message did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Joined a room; `notified` members were told
    Joined { notified: usize },
    /// Forwarded to a single peer
    Forwarded { target: PeerId },
    /// Left the current room (or was not in one)
    Left,
}

/// Decode one inbound frame and act on it for `conn`.
///
/// Errors are for the caller's log only; nothing is sent back to the client.
pub fn dispatch(conn: &mut Connection, text: &str) -> Result<Routed, SignalingError> {
    match ClientMessage::decode(text)? {
        ClientMessage::Join { room_id, user_id } => join(conn, room_id, user_id),

        ClientMessage::Offer { target_id, sdp } => forward(conn, target_id, |user_id| {
            ServerMessage::Offer { sdp, user_id }
        }),

        ClientMessage::Answer { target_id, sdp } => forward(conn, target_id, |user_id| {
            ServerMessage::Answer { sdp, user_id }
        }),

        ClientMessage::Ice { target_id, ice } => forward(conn, target_id, |user_id| {
            ServerMessage::Ice { ice, user_id }
        }),

        ClientMessage::Leave => {
            conn.cleanup();
            Ok(Routed::Left)
        }
    }
}

fn join(conn: &mut Connection, room_id: RoomId, user_id: PeerId) -> Result<Routed, SignalingError> {
    if room_id.is_empty() || user_id.is_empty() {
        return Err(SignalingError::InvalidJoin);
    }

    let membership = Membership {
        room_id,
        peer_id: user_id,
    };

    // a repeated join re-binds in place; anything else leaves the old room first
    let rejoin = conn.membership() == Some(&membership);
    if !rejoin {
        conn.cleanup();
    }

    let others = conn
        .directory()
        .join(&membership.room_id, &membership.peer_id, conn.handle());
    info!(
        "{} ({}) is {} in room {}",
        conn.id(),
        conn.addr(),
        membership.peer_id,
        membership.room_id
    );

    if !rejoin {
        conn.set_membership(membership);
    }

    Ok(Routed::Joined {
        notified: others.len(),
    })
}

fn forward(
    conn: &Connection,
    target_id: Option<PeerId>,
    build: impl FnOnce(PeerId) -> ServerMessage,
) -> Result<Routed, SignalingError> {
    let Some(Membership { room_id, peer_id }) = conn.membership() else {
        return Err(SignalingError::NotInRoom);
    };
    let target = target_id.ok_or(SignalingError::MissingTarget)?;

    let Some(handle) = conn.directory().lookup(room_id, &target) else {
        return Err(SignalingError::TargetNotFound {
            room: room_id.clone(),
            target,
        });
    };

    let msg = build(peer_id.clone());
    let kind = kind_of(&msg);
    handle.send(msg.encode()?);
    debug!("Forwarded {} from {} to {} in room {}", kind, peer_id, target, room_id);

    Ok(Routed::Forwarded { target })
}

fn kind_of(msg: &ServerMessage) -> &'static str {
    match msg {
        ServerMessage::Offer { .. } => "offer",
        ServerMessage::Answer { .. } => "answer",
        ServerMessage::Ice { .. } => "ice",
        ServerMessage::PeerJoined { .. } => "peer-joined",
        ServerMessage::PeerLeft { .. } => "peer-left",
    }
}
