//! Presence broadcasting for room membership changes.
//!
//! The registry calls a [`RoomObserver`] after every membership change,
//! while still holding its write lock, so an observer always sees the
//! membership that resulted from exactly that change.

use std::collections::HashSet;

use crate::domain::identity::Identity;
use crate::domain::room::RoomName;

use super::messages::{OnlineEditors, ServerMessage};
use super::registry::{ClientId, RoomMembers};

/// Reacts to connections entering and leaving rooms of one namespace.
///
/// Implementations must not block; they only enqueue outbound messages.
pub trait RoomObserver: Send + Sync {
    /// `client_id` joined `room`; `members` includes it.
    fn joined(&self, room: &RoomName, client_id: &ClientId, members: &RoomMembers<'_>);

    /// `client_id` left `room`; `members` no longer includes it.
    fn left(&self, room: &RoomName, client_id: &ClientId, members: &RoomMembers<'_>);
}

/// Root namespace: every change broadcasts the room's full editor list.
///
/// A person with several tabs open appears once, keyed by email.
pub struct SnapshotPresence;

impl SnapshotPresence {
    /// Distinct identities in join order.
    pub fn editors(members: &RoomMembers<'_>) -> Vec<Identity> {
        let mut seen = HashSet::new();
        members
            .iter()
            .filter_map(|member| member.identity)
            .filter(|identity| seen.insert(identity.email.as_str()))
            .cloned()
            .collect()
    }

    fn broadcast(&self, room: &RoomName, members: &RoomMembers<'_>) {
        if members.is_empty() {
            return;
        }
        let snapshot = ServerMessage::OnlineEditors(OnlineEditors {
            resource_id: room.resource_id().to_string(),
            users: Self::editors(members),
        });
        let sent = members.send_all(&snapshot);
        tracing::debug!(room = %room, recipients = sent, "Presence snapshot sent");
    }
}

impl RoomObserver for SnapshotPresence {
    fn joined(&self, room: &RoomName, _client_id: &ClientId, members: &RoomMembers<'_>) {
        self.broadcast(room, members);
    }

    fn left(&self, room: &RoomName, _client_id: &ClientId, members: &RoomMembers<'_>) {
        self.broadcast(room, members);
    }
}

/// Page-edit namespace: departures are announced, arrivals are silent.
pub struct DepartureNotice;

impl RoomObserver for DepartureNotice {
    fn joined(&self, _room: &RoomName, _client_id: &ClientId, _members: &RoomMembers<'_>) {}

    fn left(&self, room: &RoomName, client_id: &ClientId, members: &RoomMembers<'_>) {
        let sent = members.send_all(&ServerMessage::LeaveEdit(client_id.to_string()));
        tracing::debug!(room = %room, client_id = %client_id, recipients = sent, "Departure announced");
    }
}
