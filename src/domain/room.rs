//! Rooms, namespaces and the per-connection authentication state.
//!
//! Two namespaces exist side by side. A room name is the namespace prefix
//! followed by the edited resource id, so `app:42` and `page:42` are
//! unrelated rooms even though they share a resource id.

use std::fmt;

use super::identity::Identity;

/// An independent protocol channel with its own rooms and presence rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Root namespace: application-level presence snapshots and fan-out.
    App,
    /// Page-edit namespace: departure notices and pointer relay.
    Page,
}

impl Namespace {
    /// Prefix prepended to resource ids to form room names.
    pub fn room_prefix(&self) -> &'static str {
        match self {
            Namespace::App => "app:",
            Namespace::Page => "page:",
        }
    }

    /// The namespace path clients see.
    pub fn path(&self) -> &'static str {
        match self {
            Namespace::App => "/",
            Namespace::Page => "/page/edit",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A named broadcast group scoped to one edited resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomName {
    namespace: Namespace,
    resource_id: String,
}

impl RoomName {
    pub fn new(namespace: Namespace, resource_id: impl Into<String>) -> Self {
        Self {
            namespace,
            resource_id: resource_id.into(),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.namespace.room_prefix(), self.resource_id)
    }
}

/// A join that arrived before the connection's identity was known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub namespace: Namespace,
    pub resource_id: String,
}

impl JoinRequest {
    pub fn new(namespace: Namespace, resource_id: impl Into<String>) -> Self {
        Self {
            namespace,
            resource_id: resource_id.into(),
        }
    }

    pub fn room(&self) -> RoomName {
        RoomName::new(self.namespace, self.resource_id.clone())
    }
}

/// Authentication state of a single connection.
///
/// A connection starts `Unauthenticated` and moves to `Authenticated` at
/// most once, when its identity resolves. Joins requested before that are
/// parked in `pending_join`; only the most recent one survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unauthenticated { pending_join: Option<JoinRequest> },
    Authenticated { identity: Identity },
}

impl ConnectionState {
    pub fn new() -> Self {
        ConnectionState::Unauthenticated { pending_join: None }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            ConnectionState::Authenticated { identity } => Some(identity),
            ConnectionState::Unauthenticated { .. } => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
