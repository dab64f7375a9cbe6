use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{OutboundMessage, PeerId, RoomId, SignalingError};

/// Messages sent from client to server
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Join a room under a self-chosen identity
    Join {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        #[serde(rename = "userId")]
        user_id: PeerId,
    },

    Offer {
        #[serde(rename = "targetId", default)]
        target_id: Option<PeerId>,
        sdp: Value,
    },

    Answer {
        #[serde(rename = "targetId", default)]
        target_id: Option<PeerId>,
        sdp: Value,
    },

    Ice {
        #[serde(rename = "targetId", default)]
        target_id: Option<PeerId>,
        ice: Value,
    },

    /// Leave the current room
    Leave,
}

impl ClientMessage {
    pub fn decode(text: &str) -> Result<Self, SignalingError> {
        serde_json::from_str(text).map_err(SignalingError::Decode)
    }
}

/// Messages sent from server to client
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Another peer joined the room
    PeerJoined {
        #[serde(rename = "userId")]
        user_id: PeerId,
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    /// A peer left the room or disconnected
    PeerLeft {
        #[serde(rename = "userId")]
        user_id: PeerId,
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    /// Forwarded offer; `user_id` is the sender
    Offer {
        sdp: Value,
        #[serde(rename = "userId")]
        user_id: PeerId,
    },

    /// Forwarded answer; `user_id` is the sender
    Answer {
        sdp: Value,
        #[serde(rename = "userId")]
        user_id: PeerId,
    },

    /// Forwarded ICE candidate; `user_id` is the sender
    Ice {
        ice: Value,
        #[serde(rename = "userId")]
        user_id: PeerId,
    },
}

impl ServerMessage {
    pub fn encode(&self) -> Result<OutboundMessage, SignalingError> {
        serde_json::to_string(self)
            .map(OutboundMessage::from)
            .map_err(SignalingError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_join() {
        let json = r#"{"type": "join", "roomId": "R1", "userId": "A"}"#;
        match ClientMessage::decode(json).unwrap() {
            ClientMessage::Join { room_id, user_id } => {
                assert_eq!(room_id.as_str(), "R1");
                assert_eq!(user_id.as_str(), "A");
            }
            other => panic!("Expected Join, got {:?}", other),
        }
    }

    #[test]
    fn parse_join_without_user_fails() {
        let json = r#"{"type": "join", "roomId": "R1"}"#;
        assert!(matches!(
            ClientMessage::decode(json),
            Err(SignalingError::Decode(_))
        ));
    }

    #[test]
    fn parse_offer_keeps_sdp_opaque() {
        let json = r#"{"type": "offer", "targetId": "B", "sdp": {"type": "offer", "sdp": "v=0\r\n"}}"#;
        match ClientMessage::decode(json).unwrap() {
            ClientMessage::Offer { target_id, sdp } => {
                assert_eq!(target_id, Some(PeerId::from("B")));
                assert_eq!(sdp, json!({"type": "offer", "sdp": "v=0\r\n"}));
            }
            other => panic!("Expected Offer, got {:?}", other),
        }
    }

    #[test]
    fn parse_answer_without_target() {
        let json = r#"{"type": "answer", "sdp": "X"}"#;
        match ClientMessage::decode(json).unwrap() {
            ClientMessage::Answer { target_id, .. } => assert!(target_id.is_none()),
            other => panic!("Expected Answer, got {:?}", other),
        }
    }

    #[test]
    fn parse_ice() {
        let json = r#"{"type": "ice", "targetId": "A", "ice": {"candidate": "candidate:1 1 udp", "sdpMid": "0"}}"#;
        match ClientMessage::decode(json).unwrap() {
            ClientMessage::Ice { target_id, ice } => {
                assert_eq!(target_id, Some(PeerId::from("A")));
                assert_eq!(ice["sdpMid"], "0");
            }
            other => panic!("Expected Ice, got {:?}", other),
        }
    }

    #[test]
    fn parse_leave() {
        let json = r#"{"type": "leave"}"#;
        assert!(matches!(
            ClientMessage::decode(json).unwrap(),
            ClientMessage::Leave
        ));
    }

    #[test]
    fn unknown_type_is_decode_error() {
        assert!(ClientMessage::decode(r#"{"type": "shout"}"#).is_err());
        assert!(ClientMessage::decode("not json").is_err());
        assert!(ClientMessage::decode(r#"["join"]"#).is_err());
    }

    #[test]
    fn serialize_peer_joined() {
        let msg = ServerMessage::PeerJoined {
            user_id: PeerId::from("B"),
            room_id: RoomId::from("R1"),
        };
        let value: Value = serde_json::from_str(msg.encode().unwrap().as_str()).unwrap();
        assert_eq!(value, json!({"type": "peer-joined", "userId": "B", "roomId": "R1"}));
    }

    #[test]
    fn serialize_peer_left() {
        let msg = ServerMessage::PeerLeft {
            user_id: PeerId::from("A"),
            room_id: RoomId::from("R1"),
        };
        let value: Value = serde_json::from_str(msg.encode().unwrap().as_str()).unwrap();
        assert_eq!(value, json!({"type": "peer-left", "userId": "A", "roomId": "R1"}));
    }

    #[test]
    fn serialize_forwarded_offer() {
        let msg = ServerMessage::Offer {
            sdp: json!("X"),
            user_id: PeerId::from("A"),
        };
        let value: Value = serde_json::from_str(msg.encode().unwrap().as_str()).unwrap();
        assert_eq!(value, json!({"type": "offer", "sdp": "X", "userId": "A"}));
    }

    #[test]
    fn serialize_forwarded_ice() {
        let msg = ServerMessage::Ice {
            ice: json!({"candidate": "c"}),
            user_id: PeerId::from("B"),
        };
        let value: Value = serde_json::from_str(msg.encode().unwrap().as_str()).unwrap();
        assert_eq!(value, json!({"type": "ice", "ice": {"candidate": "c"}, "userId": "B"}));
    }
}
