//! WebSocket message types for the collaboration protocol.
//!
//! Every frame is a JSON text frame of the form
//! `{"event": "<name>", "data": <payload>}`.
//!
//! - Server → Client: presence snapshots, departure notices, pointer
//!   events, change notices
//! - Client → Server: start/leave edit, pointer events

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::change::ChangeNotice;
use crate::domain::identity::Identity;

/// Presence snapshot event (root namespace).
pub const EDITORS_EVENT: &str = "collab:online_editors";
/// Join request from the client.
pub const START_EDIT_EVENT: &str = "collab:start_edit";
/// Leave request from the client; departure notice from the server.
pub const LEAVE_EDIT_EVENT: &str = "collab:leave_edit";
/// Pointer position, in both directions.
pub const MOUSE_POINTER_EVENT: &str = "collab:mouse_pointer";

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Full membership of an application room.
    OnlineEditors(OnlineEditors),

    /// A connection left a page room; carries its transport id.
    LeaveEdit(String),

    /// Relayed pointer position.
    MousePointer(MousePointerEvent),

    /// Change fan-out, named `<operation>:<collection>`.
    Change(ChangeNotice),
}

/// Wire frame wrapping any payload.
#[derive(Serialize)]
struct Frame<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

impl ServerMessage {
    /// Event name carried in the frame.
    pub fn event_name(&self) -> &str {
        match self {
            ServerMessage::OnlineEditors(_) => EDITORS_EVENT,
            ServerMessage::LeaveEdit(_) => LEAVE_EDIT_EVENT,
            ServerMessage::MousePointer(_) => MOUSE_POINTER_EVENT,
            ServerMessage::Change(notice) => &notice.event,
        }
    }

    /// Serialize to a text frame.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        let event = self.event_name();
        match self {
            ServerMessage::OnlineEditors(editors) => serde_json::to_string(&Frame {
                event,
                data: editors,
            }),
            ServerMessage::LeaveEdit(client_id) => serde_json::to_string(&Frame {
                event,
                data: client_id,
            }),
            ServerMessage::MousePointer(pointer) => serde_json::to_string(&Frame {
                event,
                data: pointer,
            }),
            ServerMessage::Change(notice) => serde_json::to_string(&Frame {
                event,
                data: &notice.payload,
            }),
        }
    }
}

/// Snapshot of the distinct editors in an application room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineEditors {
    pub resource_id: String,
    pub users: Vec<Identity>,
}

/// A pointer position event.
///
/// The position fields are opaque to the server and passed through as-is.
/// `user` and `socketId` are always overwritten with the sender's values
/// before relaying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MousePointerEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<String>,

    #[serde(flatten)]
    pub position: Map<String, Value>,
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    /// Start editing a resource (application or page id).
    #[serde(rename = "collab:start_edit")]
    StartEdit(String),

    /// Stop editing a resource.
    #[serde(rename = "collab:leave_edit")]
    LeaveEdit(String),

    /// Pointer moved.
    #[serde(rename = "collab:mouse_pointer")]
    MousePointer(MousePointerEvent),
}
