//! Room membership registry for connected editors.
//!
//! Tracks every live connection, the rooms it occupies and its
//! authentication state. It is the only writer of membership; presence
//! observers and the fan-out engine read from it.
//!
//! # Architecture
//!
//! ```text
//! Room: app:42           Room: page:7
//! ├── client-a (alice)   ├── client-c (alice)
//! └── client-b (bob)     └── client-d (carol)
//!
//! Channel: alice@x.com → client-a
//! Channel: bob@x.com   → client-b
//! ```
//!
//! A connection holds at most one room per namespace. Joining a room first
//! leaves every other room of that namespace, under the same write lock, so
//! no reader ever observes two.
//!
//! Each connection owns a bounded outbox. Delivery uses `try_send`: a full
//! or closed outbox drops the message instead of blocking the sender.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::change::ChangeNotice;
use crate::domain::identity::Identity;
use crate::domain::room::{ConnectionState, JoinRequest, Namespace, RoomName};
use crate::ports::RecipientChannels;

use super::messages::ServerMessage;
use super::presence::{DepartureNotice, RoomObserver, SnapshotPresence};

/// Unique identifier for a WebSocket client connection.
///
/// Generated server-side when a client connects; doubles as the transport
/// id clients see in departure notices and pointer events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a new random client ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sending half of a connection's outbound queue.
pub type Outbox = mpsc::Sender<ServerMessage>;

/// Hands a message to one connection without waiting.
///
/// Returns false when the message was dropped.
pub(crate) fn try_deliver(client_id: &ClientId, outbox: &Outbox, message: ServerMessage) -> bool {
    match outbox.try_send(message) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(message)) => {
            tracing::debug!(
                client_id = %client_id,
                event = %message.event_name(),
                "Outbox full, dropping message"
            );
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Result of a join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The connection is now in this room.
    Joined(RoomName),
    /// The connection is unauthenticated; the join will replay on auth.
    Pending,
    /// The connection no longer exists.
    Disconnected,
}

/// One member of a room, as seen by observers.
pub struct Member<'a> {
    pub client_id: &'a ClientId,
    pub identity: Option<&'a Identity>,
    outbox: &'a Outbox,
}

/// The current members of one room, in join order.
pub struct RoomMembers<'a> {
    members: Vec<Member<'a>>,
}

impl<'a> RoomMembers<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &Member<'a>> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Send `message` to every member. Returns how many accepted it.
    pub fn send_all(&self, message: &ServerMessage) -> usize {
        self.members
            .iter()
            .filter(|member| try_deliver(member.client_id, member.outbox, message.clone()))
            .count()
    }
}

struct Connection {
    namespace: Namespace,
    state: ConnectionState,
    rooms: Vec<RoomName>,
    outbox: Outbox,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ClientId, Connection>,
    /// Room → members in join order.
    rooms: HashMap<RoomName, Vec<ClientId>>,
    /// Email → root-namespace connections listening on that private channel.
    channels: HashMap<String, HashSet<ClientId>>,
}

impl RegistryState {
    fn members(&self, room: &RoomName) -> RoomMembers<'_> {
        let members = self
            .rooms
            .get(room)
            .into_iter()
            .flatten()
            .filter_map(|client_id| {
                self.connections.get(client_id).map(|connection| Member {
                    client_id,
                    identity: connection.state.identity(),
                    outbox: &connection.outbox,
                })
            })
            .collect();
        RoomMembers { members }
    }

    fn add_member(&mut self, client_id: &ClientId, room: &RoomName) {
        if let Some(connection) = self.connections.get_mut(client_id) {
            if !connection.rooms.contains(room) {
                connection.rooms.push(room.clone());
            }
        }
        let members = self.rooms.entry(room.clone()).or_default();
        if !members.contains(client_id) {
            members.push(client_id.clone());
        }
    }

    /// Returns true if the connection was a member.
    fn remove_member(&mut self, client_id: &ClientId, room: &RoomName) -> bool {
        if let Some(connection) = self.connections.get_mut(client_id) {
            connection.rooms.retain(|held| held != room);
        }
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let before = members.len();
        members.retain(|member| member != client_id);
        let removed = members.len() != before;
        if members.is_empty() {
            self.rooms.remove(room);
        }
        removed
    }
}

/// Process-local registry of connections, rooms and identity channels.
///
/// Created once at startup and shared (`Arc`) by the gateway, the pointer
/// relay and the fan-out engine.
pub struct RoomRegistry {
    state: RwLock<RegistryState>,
    observers: HashMap<Namespace, Arc<dyn RoomObserver>>,
}

impl RoomRegistry {
    /// Create a registry with explicit per-namespace observers.
    ///
    /// Namespaces without an observer change membership silently.
    pub fn new(observers: HashMap<Namespace, Arc<dyn RoomObserver>>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            observers,
        }
    }

    /// Create a registry with the standard presence strategies:
    /// snapshots in the root namespace, departure notices in page-edit.
    pub fn with_presence() -> Self {
        let mut observers: HashMap<Namespace, Arc<dyn RoomObserver>> = HashMap::new();
        observers.insert(Namespace::App, Arc::new(SnapshotPresence));
        observers.insert(Namespace::Page, Arc::new(DepartureNotice));
        Self::new(observers)
    }

    /// Register a new, unauthenticated connection.
    pub async fn connect(&self, namespace: Namespace, outbox: Outbox) -> ClientId {
        let client_id = ClientId::new();
        self.state.write().await.connections.insert(
            client_id.clone(),
            Connection {
                namespace,
                state: ConnectionState::new(),
                rooms: Vec::new(),
                outbox,
            },
        );
        tracing::debug!(client_id = %client_id, namespace = %namespace, "Connection registered");
        client_id
    }

    /// Attach a resolved identity to a connection.
    ///
    /// Replays the pending join, if any, and subscribes root-namespace
    /// connections to their private channel. Returns false when the
    /// connection has gone away or was already authenticated.
    pub async fn authenticate(&self, client_id: &ClientId, identity: Identity) -> bool {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(connection) = state.connections.get_mut(client_id) else {
            tracing::debug!(client_id = %client_id, "Connection closed before identity resolved");
            return false;
        };

        let pending = match &mut connection.state {
            ConnectionState::Unauthenticated { pending_join } => pending_join.take(),
            ConnectionState::Authenticated { .. } => {
                tracing::warn!(client_id = %client_id, "Connection already authenticated");
                return false;
            }
        };

        let namespace = connection.namespace;
        let email = identity.email.clone();
        connection.state = ConnectionState::Authenticated { identity };

        if namespace == Namespace::App {
            state
                .channels
                .entry(email.clone())
                .or_default()
                .insert(client_id.clone());
        }

        tracing::info!(client_id = %client_id, email = %email, "Connection authenticated");

        if let Some(JoinRequest {
            namespace,
            resource_id,
        }) = pending
        {
            self.join_exclusive(state, client_id, namespace, &resource_id);
        }

        true
    }

    /// Move a connection into `namespace`'s room for `resource_id`.
    ///
    /// Unauthenticated connections have the request parked instead.
    pub async fn request_join(
        &self,
        client_id: &ClientId,
        resource_id: &str,
        namespace: Namespace,
    ) -> JoinOutcome {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(connection) = state.connections.get_mut(client_id) else {
            return JoinOutcome::Disconnected;
        };

        if let ConnectionState::Unauthenticated { pending_join } = &mut connection.state {
            tracing::debug!(
                client_id = %client_id,
                resource_id = %resource_id,
                "Join deferred until authentication"
            );
            *pending_join = Some(JoinRequest::new(namespace, resource_id));
            return JoinOutcome::Pending;
        }

        JoinOutcome::Joined(self.join_exclusive(state, client_id, namespace, resource_id))
    }

    /// Remove a connection from one room. No-op if it is not a member.
    ///
    /// A parked join for the same room is discarded as well.
    pub async fn leave(&self, client_id: &ClientId, resource_id: &str, namespace: Namespace) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let room = RoomName::new(namespace, resource_id);

        if let Some(connection) = state.connections.get_mut(client_id) {
            if let ConnectionState::Unauthenticated { pending_join } = &mut connection.state {
                if pending_join.as_ref().map(JoinRequest::room).as_ref() == Some(&room) {
                    *pending_join = None;
                }
            }
        }

        if state.remove_member(client_id, &room) {
            self.notify_left(state, &room, client_id);
        }
    }

    /// Forget a connection, leaving all of its rooms.
    pub async fn disconnect(&self, client_id: &ClientId) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let rooms = match state.connections.get(client_id) {
            Some(connection) => connection.rooms.clone(),
            None => return,
        };

        for room in &rooms {
            if state.remove_member(client_id, room) {
                self.notify_left(state, room, client_id);
            }
        }

        if let Some(connection) = state.connections.remove(client_id) {
            if let Some(identity) = connection.state.identity() {
                if let Some(listeners) = state.channels.get_mut(&identity.email) {
                    listeners.remove(client_id);
                    if listeners.is_empty() {
                        state.channels.remove(&identity.email);
                    }
                }
            }
        }

        tracing::debug!(client_id = %client_id, rooms = rooms.len(), "Connection removed");
    }

    /// Identity and current `namespace` room of a sender.
    ///
    /// `None` if the connection is unknown, unauthenticated or roomless.
    pub async fn sender_context(
        &self,
        client_id: &ClientId,
        namespace: Namespace,
    ) -> Option<(Identity, RoomName)> {
        let state = self.state.read().await;
        let connection = state.connections.get(client_id)?;
        let identity = connection.state.identity()?.clone();
        let room = connection
            .rooms
            .iter()
            .find(|room| room.namespace() == namespace)?
            .clone();
        Some((identity, room))
    }

    /// Send to every member of `room` except `sender`.
    ///
    /// Returns how many connections accepted the message.
    pub async fn emit_to_room_except(
        &self,
        room: &RoomName,
        sender: &ClientId,
        message: ServerMessage,
    ) -> usize {
        let state = self.state.read().await;
        let members = state.members(room);
        members
            .iter()
            .filter(|member| member.client_id != sender)
            .filter(|member| try_deliver(member.client_id, member.outbox, message.clone()))
            .count()
    }

    /// Rooms a connection currently occupies.
    pub async fn rooms_of(&self, client_id: &ClientId) -> Vec<RoomName> {
        self.state
            .read()
            .await
            .connections
            .get(client_id)
            .map(|connection| connection.rooms.clone())
            .unwrap_or_default()
    }

    /// Connections in a room, in join order.
    pub async fn members_of(&self, room: &RoomName) -> Vec<ClientId> {
        self.state
            .read()
            .await
            .rooms
            .get(room)
            .cloned()
            .unwrap_or_default()
    }

    /// The parked join of an unauthenticated connection.
    pub async fn pending_join(&self, client_id: &ClientId) -> Option<JoinRequest> {
        match &self.state.read().await.connections.get(client_id)?.state {
            ConnectionState::Unauthenticated { pending_join } => pending_join.clone(),
            ConnectionState::Authenticated { .. } => None,
        }
    }

    /// Whether a connection has a verified identity.
    pub async fn is_authenticated(&self, client_id: &ClientId) -> bool {
        self.state
            .read()
            .await
            .connections
            .get(client_id)
            .map(|connection| connection.state.is_authenticated())
            .unwrap_or(false)
    }

    /// Get all active room names (for monitoring/debugging).
    pub async fn active_rooms(&self) -> Vec<RoomName> {
        self.state.read().await.rooms.keys().cloned().collect()
    }

    /// Get total count of live connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    fn join_exclusive(
        &self,
        state: &mut RegistryState,
        client_id: &ClientId,
        namespace: Namespace,
        resource_id: &str,
    ) -> RoomName {
        let held: Vec<RoomName> = state
            .connections
            .get(client_id)
            .map(|connection| {
                connection
                    .rooms
                    .iter()
                    .filter(|room| room.namespace() == namespace)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        for room in &held {
            if state.remove_member(client_id, room) {
                self.notify_left(state, room, client_id);
            }
        }

        let room = RoomName::new(namespace, resource_id);
        state.add_member(client_id, &room);
        tracing::debug!(client_id = %client_id, room = %room, "Joined room");

        if let Some(observer) = self.observers.get(&namespace) {
            observer.joined(&room, client_id, &state.members(&room));
        }
        room
    }

    fn notify_left(&self, state: &RegistryState, room: &RoomName, client_id: &ClientId) {
        tracing::debug!(client_id = %client_id, room = %room, "Left room");
        if let Some(observer) = self.observers.get(&room.namespace()) {
            observer.left(room, client_id, &state.members(room));
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::with_presence()
    }
}

#[async_trait]
impl RecipientChannels for RoomRegistry {
    async fn deliver(&self, recipients: &HashSet<String>, notice: ChangeNotice) -> usize {
        let state = self.state.read().await;
        let targets: HashSet<&ClientId> = recipients
            .iter()
            .filter_map(|email| state.channels.get(email))
            .flatten()
            .collect();

        let message = ServerMessage::Change(notice);
        targets
            .into_iter()
            .filter(|client_id| {
                state.connections.get(*client_id).is_some_and(|connection| {
                    try_deliver(client_id, &connection.outbox, message.clone())
                })
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::messages::OnlineEditors;
    use serde_json::json;

    fn identity(email: &str) -> Identity {
        Identity::new(email, None)
    }

    async fn connect(
        registry: &RoomRegistry,
        namespace: Namespace,
    ) -> (ClientId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(32);
        (registry.connect(namespace, tx).await, rx)
    }

    async fn connect_as(
        registry: &RoomRegistry,
        namespace: Namespace,
        email: &str,
    ) -> (ClientId, mpsc::Receiver<ServerMessage>) {
        let (client_id, rx) = connect(registry, namespace).await;
        assert!(registry.authenticate(&client_id, identity(email)).await);
        (client_id, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn silent() -> RoomRegistry {
        RoomRegistry::new(HashMap::new())
    }

    #[tokio::test]
    async fn authenticated_join_enters_room() {
        let registry = silent();
        let (client, _rx) = connect_as(&registry, Namespace::App, "a@x.com").await;

        let outcome = registry.request_join(&client, "app1", Namespace::App).await;

        let room = RoomName::new(Namespace::App, "app1");
        assert_eq!(outcome, JoinOutcome::Joined(room.clone()));
        assert_eq!(registry.members_of(&room).await, vec![client]);
    }

    #[tokio::test]
    async fn joining_second_room_leaves_first_in_same_namespace() {
        let registry = silent();
        let (client, _rx) = connect_as(&registry, Namespace::Page, "a@x.com").await;

        registry.request_join(&client, "p1", Namespace::Page).await;
        registry.request_join(&client, "p2", Namespace::Page).await;

        assert_eq!(
            registry.rooms_of(&client).await,
            vec![RoomName::new(Namespace::Page, "p2")]
        );
        assert!(registry
            .members_of(&RoomName::new(Namespace::Page, "p1"))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn rooms_in_other_namespace_are_kept() {
        let registry = silent();
        let (client, _rx) = connect_as(&registry, Namespace::App, "a@x.com").await;

        registry.request_join(&client, "x", Namespace::App).await;
        registry.request_join(&client, "y", Namespace::Page).await;

        let rooms = registry.rooms_of(&client).await;
        assert_eq!(rooms.len(), 2);
        assert!(rooms.contains(&RoomName::new(Namespace::App, "x")));
        assert!(rooms.contains(&RoomName::new(Namespace::Page, "y")));
    }

    #[tokio::test]
    async fn unauthenticated_join_is_parked() {
        let registry = silent();
        let (client, _rx) = connect(&registry, Namespace::App).await;

        let outcome = registry.request_join(&client, "app1", Namespace::App).await;

        assert_eq!(outcome, JoinOutcome::Pending);
        assert!(registry.rooms_of(&client).await.is_empty());
        assert_eq!(
            registry.pending_join(&client).await,
            Some(JoinRequest::new(Namespace::App, "app1"))
        );
    }

    #[tokio::test]
    async fn authentication_replays_pending_join() {
        let registry = silent();
        let (client, _rx) = connect(&registry, Namespace::App).await;
        registry.request_join(&client, "app1", Namespace::App).await;

        assert!(registry.authenticate(&client, identity("a@x.com")).await);

        assert_eq!(
            registry.rooms_of(&client).await,
            vec![RoomName::new(Namespace::App, "app1")]
        );
        assert_eq!(registry.pending_join(&client).await, None);
    }

    #[tokio::test]
    async fn only_latest_pending_join_replays() {
        let registry = silent();
        let (client, _rx) = connect(&registry, Namespace::Page).await;
        registry.request_join(&client, "p1", Namespace::Page).await;
        registry.request_join(&client, "p2", Namespace::Page).await;

        registry.authenticate(&client, identity("a@x.com")).await;

        assert_eq!(
            registry.rooms_of(&client).await,
            vec![RoomName::new(Namespace::Page, "p2")]
        );
    }

    #[tokio::test]
    async fn leave_discards_matching_pending_join() {
        let registry = silent();
        let (client, _rx) = connect(&registry, Namespace::App).await;
        registry.request_join(&client, "app1", Namespace::App).await;

        registry.leave(&client, "app1", Namespace::App).await;
        registry.authenticate(&client, identity("a@x.com")).await;

        assert!(registry.rooms_of(&client).await.is_empty());
    }

    #[tokio::test]
    async fn authenticate_after_disconnect_is_ignored() {
        let registry = silent();
        let (client, _rx) = connect(&registry, Namespace::App).await;
        registry.disconnect(&client).await;

        assert!(!registry.authenticate(&client, identity("a@x.com")).await);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn second_authentication_is_rejected() {
        let registry = silent();
        let (client, _rx) = connect_as(&registry, Namespace::App, "a@x.com").await;

        assert!(!registry.authenticate(&client, identity("b@x.com")).await);

        registry.request_join(&client, "r", Namespace::App).await;
        let (sender, _) = registry.sender_context(&client, Namespace::App).await.unwrap();
        assert_eq!(sender.email, "a@x.com");
    }

    #[tokio::test]
    async fn leave_when_absent_is_noop() {
        let registry = silent();
        let (client, _rx) = connect_as(&registry, Namespace::App, "a@x.com").await;

        registry.leave(&client, "nowhere", Namespace::App).await;

        assert!(registry.rooms_of(&client).await.is_empty());
        assert!(registry.active_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn disconnect_leaves_all_rooms_and_cleans_up() {
        let registry = silent();
        let (client, _rx) = connect_as(&registry, Namespace::App, "a@x.com").await;
        registry.request_join(&client, "x", Namespace::App).await;

        registry.disconnect(&client).await;

        assert!(registry.active_rooms().await.is_empty());
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn app_join_broadcasts_snapshot_to_members() {
        let registry = RoomRegistry::with_presence();
        let (alice, mut alice_rx) = connect_as(&registry, Namespace::App, "alice@x.com").await;
        let (bob, mut bob_rx) = connect_as(&registry, Namespace::App, "bob@x.com").await;

        registry.request_join(&alice, "app1", Namespace::App).await;
        registry.request_join(&bob, "app1", Namespace::App).await;

        let expected = ServerMessage::OnlineEditors(OnlineEditors {
            resource_id: "app1".to_string(),
            users: vec![identity("alice@x.com"), identity("bob@x.com")],
        });
        assert_eq!(drain(&mut alice_rx).last(), Some(&expected));
        assert_eq!(drain(&mut bob_rx), vec![expected]);
    }

    #[tokio::test]
    async fn page_switch_notifies_previous_room() {
        let registry = RoomRegistry::with_presence();
        let (watcher, mut watcher_rx) = connect_as(&registry, Namespace::Page, "w@x.com").await;
        let (mover, mut mover_rx) = connect_as(&registry, Namespace::Page, "m@x.com").await;
        registry.request_join(&watcher, "p1", Namespace::Page).await;
        registry.request_join(&mover, "p1", Namespace::Page).await;
        drain(&mut watcher_rx);

        registry.request_join(&mover, "p2", Namespace::Page).await;

        assert_eq!(
            drain(&mut watcher_rx),
            vec![ServerMessage::LeaveEdit(mover.to_string())]
        );
        assert!(drain(&mut mover_rx).is_empty());
        assert_eq!(
            registry.rooms_of(&mover).await,
            vec![RoomName::new(Namespace::Page, "p2")]
        );
    }

    #[tokio::test]
    async fn emit_to_room_except_skips_sender() {
        let registry = silent();
        let (a, mut a_rx) = connect_as(&registry, Namespace::Page, "a@x.com").await;
        let (b, mut b_rx) = connect_as(&registry, Namespace::Page, "b@x.com").await;
        registry.request_join(&a, "p", Namespace::Page).await;
        registry.request_join(&b, "p", Namespace::Page).await;

        let sent = registry
            .emit_to_room_except(
                &RoomName::new(Namespace::Page, "p"),
                &a,
                ServerMessage::LeaveEdit("x".into()),
            )
            .await;

        assert_eq!(sent, 1);
        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(drain(&mut b_rx).len(), 1);
    }

    #[tokio::test]
    async fn deliver_reaches_each_root_connection_of_recipients_once() {
        let registry = silent();
        let (_a1, mut a1_rx) = connect_as(&registry, Namespace::App, "a@x.com").await;
        let (_a2, mut a2_rx) = connect_as(&registry, Namespace::App, "a@x.com").await;
        let (_b, mut b_rx) = connect_as(&registry, Namespace::App, "b@x.com").await;
        let (_page, mut page_rx) = connect_as(&registry, Namespace::Page, "a@x.com").await;

        let recipients = HashSet::from(["a@x.com".to_string(), "nobody@x.com".to_string()]);
        let notice = ChangeNotice::new("insert:comment", json!({"comment": {}}));
        let delivered = registry.deliver(&recipients, notice).await;

        assert_eq!(delivered, 2);
        assert_eq!(drain(&mut a1_rx).len(), 1);
        assert_eq!(drain(&mut a2_rx).len(), 1);
        assert!(drain(&mut b_rx).is_empty());
        assert!(drain(&mut page_rx).is_empty());
    }

    #[tokio::test]
    async fn deliver_skips_unauthenticated_and_disconnected() {
        let registry = silent();
        let (_anon, mut anon_rx) = connect(&registry, Namespace::App).await;
        let (gone, _gone_rx) = connect_as(&registry, Namespace::App, "g@x.com").await;
        registry.disconnect(&gone).await;

        let recipients = HashSet::from(["g@x.com".to_string()]);
        let delivered = registry
            .deliver(&recipients, ChangeNotice::new("update:commentThread", json!({})))
            .await;

        assert_eq!(delivered, 0);
        assert!(drain(&mut anon_rx).is_empty());
    }

    #[tokio::test]
    async fn full_outbox_drops_instead_of_blocking() {
        let registry = silent();
        let (tx, mut rx) = mpsc::channel(1);
        let client = registry.connect(Namespace::App, tx).await;
        registry.authenticate(&client, identity("a@x.com")).await;

        let recipients = HashSet::from(["a@x.com".to_string()]);
        let first = registry
            .deliver(&recipients, ChangeNotice::new("insert:comment", json!({})))
            .await;
        let second = registry
            .deliver(&recipients, ChangeNotice::new("update:comment", json!({})))
            .await;

        assert_eq!((first, second), (1, 0));
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn client_id_display_is_uuid() {
        let display = ClientId::new().to_string();
        assert_eq!(display.len(), 36);
    }
}
