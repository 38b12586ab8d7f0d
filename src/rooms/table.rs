use std::collections::HashMap;

use super::{ConnectionId, RoomCode};

/// Members of one room, in join order.
#[derive(Debug)]
struct Room {
    members: Vec<ConnectionId>,
}

/// Maps room codes to their member lists. A room exists only while it has
/// at least one member.
#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<RoomCode, Room>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` to `room`, creating the room if needed. Returns the members
    /// that were already present, in join order, without `id` itself.
    pub fn join(&mut self, room: &RoomCode, id: &ConnectionId) -> Vec<ConnectionId> {
        let entry = self.rooms.entry(room.clone()).or_insert_with(|| {
            tracing::debug!(room = %room, "room created");
            Room {
                members: Vec::new(),
            }
        });

        let existing: Vec<ConnectionId> = entry
            .members
            .iter()
            .filter(|m| *m != id)
            .cloned()
            .collect();
        if !entry.members.contains(id) {
            entry.members.push(id.clone());
        }
        existing
    }

    /// Remove `id` from `room` and return who is left. The room is dropped
    /// when it empties. Leaving a room one is not in changes nothing.
    pub fn leave(&mut self, room: &RoomCode, id: &ConnectionId) -> Vec<ConnectionId> {
        let Some(entry) = self.rooms.get_mut(room) else {
            return Vec::new();
        };
        entry.members.retain(|m| m != id);
        if entry.members.is_empty() {
            self.rooms.remove(room);
            tracing::debug!(room = %room, "room deleted");
            return Vec::new();
        }
        entry.members.clone()
    }

    pub fn members(&self, room: &RoomCode) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|r| r.members.clone())
            .unwrap_or_default()
    }

    pub fn is_member(&self, room: &RoomCode, id: &ConnectionId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|r| r.members.contains(id))
    }

    /// Number of members in `room` (zero for absent rooms).
    pub fn len(&self, room: &RoomCode) -> usize {
        self.rooms.get(room).map_or(0, |r| r.members.len())
    }

    pub fn contains(&self, room: &RoomCode) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    #[cfg(test)]
    fn codes(&self) -> impl Iterator<Item = &RoomCode> {
        self.rooms.keys()
    }
}
