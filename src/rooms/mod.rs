pub mod registry;
pub mod table;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use registry::{ConnectionRegistry, RegistryEntry, RegistryError};
pub use table::RoomTable;

/// Maximum length of a room code, in characters.
pub const MAX_ROOM_CODE_LEN: usize = 64;
/// Maximum length of a display label, in characters.
pub const MAX_LABEL_LEN: usize = 32;

/// Identifier of one live gateway connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque room code chosen by whoever opens the room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Validates a client-supplied room code. Surrounding whitespace is
    /// trimmed; the rest must be non-empty, at most [`MAX_ROOM_CODE_LEN`]
    /// characters and free of whitespace and control characters.
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim();
        if code.is_empty() || code.chars().count() > MAX_ROOM_CODE_LEN {
            return None;
        }
        if code.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return None;
        }
        Some(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A room member as announced to other clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: ConnectionId,
    pub label: String,
}

/// Cleans up a client-supplied display label. Returns `None` when nothing
/// printable is left.
pub fn sanitize_label(raw: &str) -> Option<String> {
    let label: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_LABEL_LEN)
        .collect();
    let label = label.trim_end().to_string();
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

/// Label given to connections that did not pick one.
pub fn default_label(id: &ConnectionId) -> String {
    let short: String = id.as_str().chars().take(8).collect();
    format!("guest-{short}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_trims_whitespace() {
        let code = RoomCode::parse("  ABC123 ").unwrap();
        assert_eq!(code.as_str(), "ABC123");
    }

    #[test]
    fn test_room_code_rejects_empty_and_inner_space() {
        assert!(RoomCode::parse("").is_none());
        assert!(RoomCode::parse("   ").is_none());
        assert!(RoomCode::parse("ABC 123").is_none());
        assert!(RoomCode::parse("ABC\n123").is_none());
    }

    #[test]
    fn test_room_code_length_limit() {
        let max = "x".repeat(MAX_ROOM_CODE_LEN);
        assert!(RoomCode::parse(&max).is_some());
        let too_long = "x".repeat(MAX_ROOM_CODE_LEN + 1);
        assert!(RoomCode::parse(&too_long).is_none());
    }

    #[test]
    fn test_room_code_accepts_url_tokens() {
        assert!(RoomCode::parse("team-standup_2024").is_some());
        assert!(RoomCode::parse("réunion").is_some());
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("  alice "), Some("alice".to_string()));
        assert_eq!(sanitize_label("bo\u{0007}b"), Some("bob".to_string()));
        assert_eq!(sanitize_label("   "), None);
        let long = "a".repeat(MAX_LABEL_LEN + 10);
        assert_eq!(sanitize_label(&long).unwrap().len(), MAX_LABEL_LEN);
    }

    #[test]
    fn test_default_label_uses_id_prefix() {
        let id = ConnectionId::from("0123456789abcdef");
        assert_eq!(default_label(&id), "guest-01234567");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();
        assert_ne!(a, b);
    }
}
