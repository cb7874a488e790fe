//! WebSocket adapters for collaborative editing sessions.
//!
//! This module is the connection gateway: it accepts editor connections,
//! tracks which rooms they occupy and pushes presence, pointer and change
//! events to them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Gateway (/ws, /ws/page/edit)                        │
//! │   - Resolves identity after upgrade                                 │
//! │   - Dispatches start_edit / leave_edit / mouse_pointer              │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         RoomRegistry                                │
//! │   Room: app:42         Room: page:7          Channel: a@x.com       │
//! │   ├── client-a         ├── client-c          └── client-a           │
//! │   └── client-b         └── client-d                                 │
//! └─────────────────────────────────────────────────────────────────────┘
//!          │ membership changes                   ▲ change notices
//!          ▼                                      │
//! ┌──────────────────────────────┐   ┌──────────────────────────────────┐
//! │ SnapshotPresence (app)       │   │ ChangeFanOut                     │
//! │ DepartureNotice  (page)      │   │ (via RecipientChannels)          │
//! └──────────────────────────────┘   └──────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - WebSocket message protocol types
//! - [`registry`] - Connections, rooms and identity channels
//! - [`presence`] - Per-namespace presence strategies
//! - [`pointer`] - Cursor relay for page rooms
//! - [`handler`] - Axum WebSocket upgrade handlers

pub mod handler;
pub mod messages;
pub mod pointer;
pub mod presence;
pub mod registry;

pub use handler::{
    app_ws_handler, authenticate_connection, dispatch, page_ws_handler, websocket_router,
    WebSocketState, APP_WS_PATH, PAGE_WS_PATH,
};
pub use messages::{ClientMessage, MousePointerEvent, OnlineEditors, ServerMessage};
pub use pointer::PointerRelay;
pub use presence::{DepartureNotice, RoomObserver, SnapshotPresence};
pub use registry::{ClientId, JoinOutcome, Outbox, RoomRegistry};
