//! WebSocket signaling relay: rooms, membership notifications and
//! peer-to-peer forwarding of negotiation messages

mod connection;
mod directory;
mod messages;
mod router;
mod server;
mod types;

pub use connection::{Connection, Membership};
pub use directory::RoomDirectory;
pub use messages::{ClientMessage, ServerMessage};
pub use router::{Routed, dispatch};
pub use server::{DEFAULT_SIGNALING_PORT, HTTP_ACK_BODY, SignalingServer};
pub use types::{ConnectionId, OutboundMessage, PeerHandle, PeerId, RoomId, SignalingError};
