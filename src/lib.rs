//! Signaling relay for WebRTC peers.
//!
//! Browsers connect over WebSocket, join a named room under a chosen id and
//! exchange offers, answers and ICE candidates addressed to one another.
//! The relay routes those payloads without looking inside them.

pub mod config;
pub mod signaling;
