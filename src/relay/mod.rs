pub mod events;

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::rooms::{
    default_label, ConnectionId, ConnectionRegistry, Member, RegistryEntry, RegistryError,
    RoomCode, RoomTable,
};
use events::{fan_out, Delivery, Inbound, Outbound, Payload};

/// Registry and room table together. Every method is a pure state
/// transition that returns the deliveries it implies; nothing here does I/O.
#[derive(Debug, Default)]
pub struct RelayState {
    registry: ConnectionRegistry,
    rooms: RoomTable,
    max_room_members: Option<usize>,
}

impl RelayState {
    pub fn new(max_room_members: Option<usize>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomTable::new(),
            max_room_members,
        }
    }

    pub fn register(
        &mut self,
        id: ConnectionId,
        label: String,
    ) -> Result<RegistryEntry, RegistryError> {
        self.registry.register(id, label)
    }

    /// Apply one inbound event from `from` and return who must be told what.
    /// Events from unregistered connections are ignored.
    pub fn apply(&mut self, from: &ConnectionId, inbound: Inbound) -> Vec<Delivery> {
        if !self.registry.contains(from) {
            tracing::debug!(connection = %from, "event from unknown connection dropped");
            return Vec::new();
        }
        match inbound {
            Inbound::Join { room, label } => self.join(from, room, label),
            Inbound::Leave => self.leave_current(from),
            Inbound::Relay { room, payload } => self.relay(from, room, payload),
        }
    }

    /// Leave the current room (if any) and forget the connection. Calling it
    /// again for the same connection is a no-op.
    pub fn disconnect(&mut self, id: &ConnectionId) -> Vec<Delivery> {
        let deliveries = self.leave_current(id);
        self.registry.unregister(id);
        deliveries
    }

    pub fn members(&self, room: &RoomCode) -> Vec<Member> {
        self.rooms
            .members(room)
            .iter()
            .map(|id| self.member(id))
            .collect()
    }

    pub fn room_of(&self, id: &ConnectionId) -> Option<RoomCode> {
        self.registry.lookup_room(id)
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            connections: self.registry.len(),
            rooms: self.rooms.room_count(),
        }
    }

    fn join(
        &mut self,
        from: &ConnectionId,
        room: RoomCode,
        label: Option<String>,
    ) -> Vec<Delivery> {
        // Re-joining the current room only refreshes the member list; the
        // label stays as peers last saw it.
        if self.registry.lookup_room(from).as_ref() == Some(&room) {
            let members = self
                .rooms
                .members(&room)
                .iter()
                .filter(|id| *id != from)
                .map(|id| self.member(id))
                .collect();
            return vec![Delivery::new(
                from.clone(),
                Arc::new(Outbound::RoomMembers { room, members }),
            )];
        }

        if let Some(capacity) = self.max_room_members {
            if self.rooms.len(&room) >= capacity {
                tracing::debug!(room = %room, connection = %from, capacity, "room full");
                return vec![Delivery::new(
                    from.clone(),
                    Arc::new(Outbound::RoomFull { room, capacity }),
                )];
            }
        }

        let mut deliveries = self.leave_current(from);

        if let Some(label) = label {
            self.registry.set_label(from, label);
        }
        self.registry.assign_room(from, room.clone());
        let existing = self.rooms.join(&room, from);
        tracing::debug!(room = %room, connection = %from, peers = existing.len(), "joined room");

        let joiner = self.member(from);
        let members = existing.iter().map(|id| self.member(id)).collect();
        deliveries.push(Delivery::new(
            from.clone(),
            Arc::new(Outbound::RoomMembers {
                room: room.clone(),
                members,
            }),
        ));
        deliveries.extend(fan_out(
            &existing,
            Outbound::PeerJoined {
                room,
                id: joiner.id,
                label: joiner.label,
            },
        ));
        deliveries
    }

    fn leave_current(&mut self, id: &ConnectionId) -> Vec<Delivery> {
        let Some(room) = self.registry.clear_room(id) else {
            return Vec::new();
        };
        let remaining = self.rooms.leave(&room, id);
        tracing::debug!(room = %room, connection = %id, remaining = remaining.len(), "left room");
        fan_out(
            &remaining,
            Outbound::PeerLeft {
                room,
                id: id.clone(),
            },
        )
    }

    fn relay(
        &mut self,
        from: &ConnectionId,
        claimed: Option<RoomCode>,
        payload: Payload,
    ) -> Vec<Delivery> {
        let Some(room) = self.registry.lookup_room(from) else {
            tracing::debug!(connection = %from, "relay from connection without room dropped");
            return Vec::new();
        };
        if claimed.as_ref().is_some_and(|c| *c != room) {
            tracing::debug!(room = %room, connection = %from, "relay for stale room dropped");
            return Vec::new();
        }

        let sender = self.member(from);
        let members = self.rooms.members(&room);
        let others = members.iter().filter(|id| *id != from);

        match payload {
            Payload::Chat { text } => fan_out(others, Outbound::ChatMessage { room, text, sender }),
            Payload::VoiceNote { payload } => fan_out(
                others,
                Outbound::VoiceMessage {
                    room,
                    payload,
                    sender,
                },
            ),
            Payload::Signal {
                to: Some(target),
                payload,
            } => {
                if target == *from || !self.rooms.is_member(&room, &target) {
                    tracing::debug!(room = %room, connection = %from, target = %target, "signal target not in room");
                    return Vec::new();
                }
                vec![Delivery::new(
                    target,
                    Arc::new(Outbound::Signal {
                        room,
                        payload,
                        sender,
                    }),
                )]
            }
            Payload::Signal { to: None, payload } => fan_out(
                others,
                Outbound::Signal {
                    room,
                    payload,
                    sender,
                },
            ),
        }
    }

    fn member(&self, id: &ConnectionId) -> Member {
        Member {
            id: id.clone(),
            label: self
                .registry
                .label(id)
                .map(str::to_string)
                .unwrap_or_else(|| default_label(id)),
        }
    }
}

/// Live counts exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub connections: usize,
    pub rooms: usize,
}

/// Shared handle to the relay state. One coarse lock guards the registry and
/// the room table together; it is only held while deciding, never while
/// delivering.
#[derive(Debug, Default)]
pub struct Relay {
    state: Mutex<RelayState>,
}

impl Relay {
    pub fn new(max_room_members: Option<usize>) -> Self {
        Self {
            state: Mutex::new(RelayState::new(max_room_members)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RelayState> {
        // State transitions never panic halfway, so a poisoned lock still
        // guards consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(
        &self,
        id: ConnectionId,
        label: String,
    ) -> Result<RegistryEntry, RegistryError> {
        self.lock().register(id, label)
    }

    pub fn handle(&self, from: &ConnectionId, inbound: Inbound) -> Vec<Delivery> {
        self.lock().apply(from, inbound)
    }

    pub fn disconnect(&self, id: &ConnectionId) -> Vec<Delivery> {
        self.lock().disconnect(id)
    }

    pub fn members(&self, room: &RoomCode) -> Vec<Member> {
        self.lock().members(room)
    }

    pub fn room_of(&self, id: &ConnectionId) -> Option<RoomCode> {
        self.lock().room_of(id)
    }

    pub fn stats(&self) -> RelayStats {
        self.lock().stats()
    }
}
