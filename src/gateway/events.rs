use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::relay::events::{Inbound, Outbound, Payload};
use crate::rooms::{sanitize_label, ConnectionId, RoomCode};

/// Longest chat message accepted, in characters.
pub const MAX_CHAT_LEN: usize = 4000;

/// Opcodes for gateway frames.
pub mod opcode {
    /// Events in either direction; the `type` field names the event.
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const HEARTBEAT_ACK: u8 = 4;
    pub const HELLO: u8 = 5;
}

/// Close codes.
pub mod close_code {
    pub const REGISTRATION_FAILED: u16 = 4000;
    pub const SESSION_TIMED_OUT: u16 = 4009;
}

/// Gateway frame envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct JoinData {
    room: String,
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatData {
    text: String,
    room: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoiceData {
    payload: serde_json::Value,
    room: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignalData {
    payload: serde_json::Value,
    to: Option<String>,
    room: Option<String>,
}

/// A decoded client frame.
#[derive(Debug, PartialEq)]
pub enum ClientFrame {
    Heartbeat,
    Event(Inbound),
}

#[derive(Debug)]
pub enum DecodeError {
    Json(serde_json::Error),
    UnknownOpcode(u8),
    MissingType,
    UnknownType(String),
    InvalidRoom(String),
    EmptyPayload,
    MessageTooLong(usize),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Json(e) => write!(f, "invalid frame: {e}"),
            DecodeError::UnknownOpcode(op) => write!(f, "unknown opcode {op}"),
            DecodeError::MissingType => f.write_str("dispatch frame without type"),
            DecodeError::UnknownType(t) => write!(f, "unknown event type {t:?}"),
            DecodeError::InvalidRoom(code) => write!(f, "invalid room code {code:?}"),
            DecodeError::EmptyPayload => f.write_str("empty payload"),
            DecodeError::MessageTooLong(len) => {
                write!(f, "chat message of {len} characters exceeds {MAX_CHAT_LEN}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Json(e)
    }
}

fn data_as<T: serde::de::DeserializeOwned>(data: Option<serde_json::Value>) -> Result<T, DecodeError> {
    Ok(serde_json::from_value(data.unwrap_or(serde_json::Value::Null))?)
}

fn room_code(raw: &str) -> Result<RoomCode, DecodeError> {
    RoomCode::parse(raw).ok_or_else(|| DecodeError::InvalidRoom(raw.to_string()))
}

fn optional_room(raw: Option<String>) -> Result<Option<RoomCode>, DecodeError> {
    raw.as_deref().map(room_code).transpose()
}

/// Decode one text frame from a client.
pub fn decode(text: &str) -> Result<ClientFrame, DecodeError> {
    let msg: GatewayMessage = serde_json::from_str(text)?;
    match msg.op {
        opcode::HEARTBEAT => Ok(ClientFrame::Heartbeat),
        opcode::DISPATCH => {
            let event_type = msg.event_type.ok_or(DecodeError::MissingType)?;
            decode_event(&event_type, msg.data).map(ClientFrame::Event)
        }
        op => Err(DecodeError::UnknownOpcode(op)),
    }
}

fn decode_event(event_type: &str, data: Option<serde_json::Value>) -> Result<Inbound, DecodeError> {
    match event_type {
        "join" => {
            let join: JoinData = data_as(data)?;
            Ok(Inbound::Join {
                room: room_code(&join.room)?,
                label: join.label.as_deref().and_then(sanitize_label),
            })
        }
        "leave" => Ok(Inbound::Leave),
        "chat-message" => {
            let chat: ChatData = data_as(data)?;
            if chat.text.trim().is_empty() {
                return Err(DecodeError::EmptyPayload);
            }
            let len = chat.text.chars().count();
            if len > MAX_CHAT_LEN {
                return Err(DecodeError::MessageTooLong(len));
            }
            Ok(Inbound::Relay {
                room: optional_room(chat.room)?,
                payload: Payload::Chat { text: chat.text },
            })
        }
        "voice-message" => {
            let voice: VoiceData = data_as(data)?;
            if voice.payload.is_null() {
                return Err(DecodeError::EmptyPayload);
            }
            Ok(Inbound::Relay {
                room: optional_room(voice.room)?,
                payload: Payload::VoiceNote {
                    payload: voice.payload,
                },
            })
        }
        "signal" => {
            let signal: SignalData = data_as(data)?;
            if signal.payload.is_null() {
                return Err(DecodeError::EmptyPayload);
            }
            Ok(Inbound::Relay {
                room: optional_room(signal.room)?,
                payload: Payload::Signal {
                    to: signal.to.map(ConnectionId::from),
                    payload: signal.payload,
                },
            })
        }
        other => Err(DecodeError::UnknownType(other.to_string())),
    }
}

/// Encode a relay event as a dispatch frame carrying `seq`.
pub fn encode_dispatch(seq: u64, event: &Outbound) -> Result<String, serde_json::Error> {
    let mut frame = serde_json::to_value(event)?;
    if let Some(obj) = frame.as_object_mut() {
        obj.insert("op".to_string(), serde_json::json!(opcode::DISPATCH));
        obj.insert("seq".to_string(), serde_json::json!(seq));
    }
    Ok(frame.to_string())
}

pub fn hello(connection_id: &ConnectionId, label: &str, heartbeat_interval: Duration) -> String {
    serde_json::json!({
        "op": opcode::HELLO,
        "data": {
            "connection_id": connection_id,
            "label": label,
            "heartbeat_interval": heartbeat_interval.as_millis() as u64
        }
    })
    .to_string()
}

pub fn heartbeat_ack() -> String {
    serde_json::json!({ "op": opcode::HEARTBEAT_ACK }).to_string()
}
