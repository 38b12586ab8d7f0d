use std::collections::HashMap;
use std::fmt;

use super::{ConnectionId, RoomCode};

/// What the server knows about one live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub id: ConnectionId,
    pub label: String,
    pub room: Option<RoomCode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A connection with this identifier is already registered.
    Duplicate(ConnectionId),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Duplicate(id) => write!(f, "connection {id} is already registered"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Maps live connections to their label and current room.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<ConnectionId, RegistryEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection with no room. Fails without touching the existing
    /// entry if the identifier is taken.
    pub fn register(
        &mut self,
        id: ConnectionId,
        label: String,
    ) -> Result<RegistryEntry, RegistryError> {
        if self.entries.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        let entry = RegistryEntry {
            id: id.clone(),
            label,
            room: None,
        };
        self.entries.insert(id, entry.clone());
        Ok(entry)
    }

    /// Record the connection's room, replacing any previous assignment.
    /// Unknown connections are ignored.
    pub fn assign_room(&mut self, id: &ConnectionId, room: RoomCode) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.room = Some(room);
        }
    }

    pub fn clear_room(&mut self, id: &ConnectionId) -> Option<RoomCode> {
        self.entries.get_mut(id).and_then(|e| e.room.take())
    }

    pub fn lookup_room(&self, id: &ConnectionId) -> Option<RoomCode> {
        self.entries.get(id).and_then(|e| e.room.clone())
    }

    pub fn set_label(&mut self, id: &ConnectionId, label: String) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.label = label;
        }
    }

    pub fn label(&self, id: &ConnectionId) -> Option<&str> {
        self.entries.get(id).map(|e| e.label.as_str())
    }

    /// Remove the connection. A second call for the same id returns `None`.
    pub fn unregister(&mut self, id: &ConnectionId) -> Option<RegistryEntry> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
