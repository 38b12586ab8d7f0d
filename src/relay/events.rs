use serde::Serialize;
use std::sync::Arc;

use crate::rooms::{ConnectionId, Member, RoomCode};

/// One decoded client event, ready for the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Join {
        room: RoomCode,
        label: Option<String>,
    },
    Leave,
    /// Chat, voice note or signaling payload for the sender's current room.
    /// `room` is what the client believes its room to be; a mismatch means the
    /// event raced a room switch and is dropped.
    Relay {
        room: Option<RoomCode>,
        payload: Payload,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Chat {
        text: String,
    },
    VoiceNote {
        payload: serde_json::Value,
    },
    Signal {
        to: Option<ConnectionId>,
        payload: serde_json::Value,
    },
}

/// Server-to-client events. Serialized as the `type` and `data` of a
/// dispatch frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Outbound {
    RoomMembers {
        room: RoomCode,
        members: Vec<Member>,
    },
    PeerJoined {
        room: RoomCode,
        id: ConnectionId,
        label: String,
    },
    PeerLeft {
        room: RoomCode,
        id: ConnectionId,
    },
    RoomFull {
        room: RoomCode,
        capacity: usize,
    },
    ChatMessage {
        room: RoomCode,
        text: String,
        sender: Member,
    },
    VoiceMessage {
        room: RoomCode,
        payload: serde_json::Value,
        sender: Member,
    },
    Signal {
        room: RoomCode,
        payload: serde_json::Value,
        sender: Member,
    },
}

impl Outbound {
    pub fn kind(&self) -> &'static str {
        match self {
            Outbound::RoomMembers { .. } => "room-members",
            Outbound::PeerJoined { .. } => "peer-joined",
            Outbound::PeerLeft { .. } => "peer-left",
            Outbound::RoomFull { .. } => "room-full",
            Outbound::ChatMessage { .. } => "chat-message",
            Outbound::VoiceMessage { .. } => "voice-message",
            Outbound::Signal { .. } => "signal",
        }
    }
}

/// A single outbound event addressed to one connection. Recipients of the
/// same fan-out share the event.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub recipient: ConnectionId,
    pub event: Arc<Outbound>,
}

impl Delivery {
    pub fn new(recipient: ConnectionId, event: Arc<Outbound>) -> Self {
        Self { recipient, event }
    }
}

/// Address one shared event to every connection in `recipients`.
pub fn fan_out<'a, I>(recipients: I, event: Outbound) -> Vec<Delivery>
where
    I: IntoIterator<Item = &'a ConnectionId>,
{
    let event = Arc::new(event);
    recipients
        .into_iter()
        .map(|id| Delivery::new(id.clone(), Arc::clone(&event)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_joined_shape() {
        let event = Outbound::PeerJoined {
            room: RoomCode::parse("R1").unwrap(),
            id: "b".into(),
            label: "bob".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "peer-joined");
        assert_eq!(json["data"]["room"], "R1");
        assert_eq!(json["data"]["id"], "b");
        assert_eq!(json["data"]["label"], "bob");
    }

    #[test]
    fn test_kind_matches_serialized_type() {
        let room = RoomCode::parse("R1").unwrap();
        let events = [
            Outbound::RoomMembers {
                room: room.clone(),
                members: vec![],
            },
            Outbound::PeerLeft {
                room: room.clone(),
                id: "a".into(),
            },
            Outbound::RoomFull {
                room: room.clone(),
                capacity: 2,
            },
            Outbound::Signal {
                room,
                payload: serde_json::json!({"sdp": "v=0"}),
                sender: Member {
                    id: "a".into(),
                    label: "alice".into(),
                },
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.kind());
        }
    }

    #[test]
    fn test_fan_out_shares_one_event() {
        let recipients: Vec<ConnectionId> = vec!["a".into(), "b".into()];
        let deliveries = fan_out(
            &recipients,
            Outbound::PeerLeft {
                room: RoomCode::parse("R").unwrap(),
                id: "c".into(),
            },
        );
        assert_eq!(deliveries.len(), 2);
        assert!(Arc::ptr_eq(&deliveries[0].event, &deliveries[1].event));
        assert_eq!(deliveries[1].recipient, ConnectionId::from("b"));
    }
}
