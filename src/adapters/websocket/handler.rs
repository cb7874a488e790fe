//! WebSocket upgrade handler for collaborative editing connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Read the session cookie from the upgrade request
//! 2. Upgrade to WebSocket and register an unauthenticated connection
//! 3. Resolve the identity in the background while frames are processed
//! 4. Dispatch join/leave/pointer frames until disconnect
//! 5. Release room membership and the identity channel

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap},
    response::Response,
    routing::get,
    Router,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::domain::identity::{AuthError, SessionCredential};
use crate::domain::room::Namespace;
use crate::ports::IdentityResolver;

use super::{
    messages::{ClientMessage, ServerMessage},
    pointer::PointerRelay,
    registry::{ClientId, RoomRegistry},
};

/// Path of the root namespace endpoint.
pub const APP_WS_PATH: &str = "/ws";
/// Path of the page-edit namespace endpoint.
pub const PAGE_WS_PATH: &str = "/ws/page/edit";

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    /// Room membership shared with the fan-out engine.
    pub registry: Arc<RoomRegistry>,
    pub resolver: Arc<dyn IdentityResolver>,
    pub relay: PointerRelay,
    /// Per-connection outbound queue length.
    pub outbox_capacity: usize,
}

impl WebSocketState {
    /// Create a new WebSocket state.
    pub fn new(
        registry: Arc<RoomRegistry>,
        resolver: Arc<dyn IdentityResolver>,
        outbox_capacity: usize,
    ) -> Self {
        Self {
            relay: PointerRelay::new(registry.clone()),
            registry,
            resolver,
            outbox_capacity: outbox_capacity.max(1),
        }
    }
}

/// Handle WebSocket upgrade requests for the root namespace.
///
/// Route: `GET /ws`
pub async fn app_ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<WebSocketState>,
) -> Response {
    upgrade(ws, &headers, state, Namespace::App)
}

/// Handle WebSocket upgrade requests for the page-edit namespace.
///
/// Route: `GET /ws/page/edit`
pub async fn page_ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<WebSocketState>,
) -> Response {
    upgrade(ws, &headers, state, Namespace::Page)
}

fn upgrade(
    ws: WebSocketUpgrade,
    headers: &HeaderMap,
    state: WebSocketState,
    namespace: Namespace,
) -> Response {
    let credential = session_credential(headers);
    ws.on_upgrade(move |socket| handle_socket(socket, namespace, credential, state))
}

/// Find the session cookie among the request's `Cookie` headers.
pub fn session_credential(headers: &HeaderMap) -> Option<SessionCredential> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(SessionCredential::from_cookie_header)
}

/// Handle an established WebSocket connection.
///
/// Runs for the lifetime of the connection. Identity resolution runs
/// concurrently, so frames received before it completes are handled as
/// unauthenticated (joins are parked, pointer events dropped).
async fn handle_socket(
    socket: WebSocket,
    namespace: Namespace,
    credential: Option<SessionCredential>,
    state: WebSocketState,
) {
    let (mut sender, mut receiver) = socket.split();

    let (outbox, mut outbox_rx) = mpsc::channel::<ServerMessage>(state.outbox_capacity);
    let client_id = state.registry.connect(namespace, outbox).await;

    let auth_task = tokio::spawn(authenticate_connection(
        state.registry.clone(),
        state.resolver.clone(),
        client_id.clone(),
        credential,
    ));

    // Forward queued messages to the client
    let mut send_task = {
        let client_id = client_id.clone();
        tokio::spawn(async move {
            while let Some(message) = outbox_rx.recv().await {
                if let Err(e) = send_message(&mut sender, &client_id, &message).await {
                    tracing::debug!(
                        client_id = %client_id,
                        "Send error, closing connection: {}",
                        e
                    );
                    break;
                }
            }
        })
    };

    // Handle incoming messages from client
    let mut recv_task = {
        let state = state.clone();
        let client_id = client_id.clone();
        tokio::spawn(async move {
            while let Some(result) = receiver.next().await {
                match result {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => dispatch(&state, &client_id, namespace, message).await,
                        Err(e) => {
                            tracing::debug!(
                                client_id = %client_id,
                                "Ignoring unparseable frame: {}",
                                e
                            );
                        }
                    },
                    Ok(Message::Binary(_)) => {
                        tracing::warn!(
                            client_id = %client_id,
                            "Received unsupported binary message"
                        );
                    }
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                    Ok(Message::Close(_)) => {
                        tracing::debug!(client_id = %client_id, "Client sent close frame");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(client_id = %client_id, "Receive error: {}", e);
                        break;
                    }
                }
            }
        })
    };

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    auth_task.abort();
    state.registry.disconnect(&client_id).await;
    tracing::debug!(client_id = %client_id, namespace = %namespace, "Connection closed");
}

/// Apply one client frame to the registry or the pointer relay.
///
/// Frames of one connection are dispatched in receipt order.
pub async fn dispatch(
    state: &WebSocketState,
    client_id: &ClientId,
    namespace: Namespace,
    message: ClientMessage,
) {
    match message {
        ClientMessage::StartEdit(resource_id) => {
            state
                .registry
                .request_join(client_id, &resource_id, namespace)
                .await;
        }
        ClientMessage::LeaveEdit(resource_id) => {
            state.registry.leave(client_id, &resource_id, namespace).await;
        }
        ClientMessage::MousePointer(event) => {
            if namespace == Namespace::Page {
                state.relay.relay(client_id, event).await;
            } else {
                tracing::trace!(client_id = %client_id, "Pointer event outside page namespace ignored");
            }
        }
    }
}

/// Resolve a connection's identity and attach it to the registry.
///
/// Returns true if the connection ended up authenticated. Every failure
/// leaves the connection open but unauthenticated.
pub async fn authenticate_connection(
    registry: Arc<RoomRegistry>,
    resolver: Arc<dyn IdentityResolver>,
    client_id: ClientId,
    credential: Option<SessionCredential>,
) -> bool {
    match resolver.resolve(credential.as_ref()).await {
        Ok(identity) => registry.authenticate(&client_id, identity).await,
        Err(AuthError::MissingCredential) => {
            tracing::debug!(client_id = %client_id, "No session cookie, staying unauthenticated");
            false
        }
        Err(AuthError::InvalidSession) => {
            tracing::info!(client_id = %client_id, "Session rejected, staying unauthenticated");
            false
        }
        Err(e) => {
            tracing::warn!(client_id = %client_id, error = %e, "Identity resolution failed");
            false
        }
    }
}

/// Send a JSON frame over the WebSocket.
///
/// A message that fails to serialize is logged and skipped.
async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    client_id: &ClientId,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    match message.to_frame() {
        Ok(frame) => sender.send(Message::Text(frame)).await,
        Err(e) => {
            tracing::warn!(
                client_id = %client_id,
                event = %message.event_name(),
                "Failed to serialize frame: {}",
                e
            );
            Ok(())
        }
    }
}

/// Create axum router for both namespace endpoints.
///
/// # Example
///
/// ```ignore
/// let app = websocket_router().with_state(ws_state);
/// ```
pub fn websocket_router() -> Router<WebSocketState> {
    Router::new()
        .route(APP_WS_PATH, get(app_ws_handler))
        .route(PAGE_WS_PATH, get(page_ws_handler))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderValue;
    use serde_json::{json, Map};

    use super::*;
    use crate::adapters::auth::MockIdentityResolver;
    use crate::adapters::websocket::messages::MousePointerEvent;
    use crate::domain::identity::Identity;
    use crate::domain::room::RoomName;

    fn state_with(resolver: MockIdentityResolver) -> WebSocketState {
        WebSocketState::new(
            Arc::new(RoomRegistry::with_presence()),
            Arc::new(resolver),
            16,
        )
    }

    async fn connect(
        state: &WebSocketState,
        namespace: Namespace,
    ) -> (ClientId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(16);
        (state.registry.connect(namespace, tx).await, rx)
    }

    #[test]
    fn websocket_state_shares_registry() {
        let registry = Arc::new(RoomRegistry::with_presence());
        let state = WebSocketState::new(registry.clone(), Arc::new(MockIdentityResolver::new()), 0);

        assert!(Arc::ptr_eq(&state.registry, &registry));
        assert_eq!(state.outbox_capacity, 1);
    }

    #[test]
    fn websocket_router_creates_routes() {
        let _router = websocket_router();
    }

    #[test]
    fn session_credential_read_from_any_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("SESSION=abc"));

        let credential = session_credential(&headers).unwrap();

        assert_eq!(credential.cookie_header(), "SESSION=abc");
    }

    #[test]
    fn no_cookie_header_means_no_credential() {
        assert!(session_credential(&HeaderMap::new()).is_none());
    }

    #[tokio::test]
    async fn authenticate_connection_attaches_identity() {
        let state = state_with(
            MockIdentityResolver::new().with_session("abc", Identity::new("a@x.com", None)),
        );
        let (client, _rx) = connect(&state, Namespace::App).await;

        let authenticated = authenticate_connection(
            state.registry.clone(),
            state.resolver.clone(),
            client.clone(),
            Some(SessionCredential::new("abc")),
        )
        .await;

        assert!(authenticated);
        assert!(state.registry.is_authenticated(&client).await);
    }

    #[tokio::test]
    async fn failed_resolution_leaves_connection_unauthenticated() {
        let state = state_with(MockIdentityResolver::new());
        let (client, _rx) = connect(&state, Namespace::App).await;

        let authenticated = authenticate_connection(
            state.registry.clone(),
            state.resolver.clone(),
            client.clone(),
            Some(SessionCredential::new("bogus")),
        )
        .await;

        assert!(!authenticated);
        assert!(!state.registry.is_authenticated(&client).await);
        assert_eq!(state.registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn disconnect_during_resolution_discards_identity() {
        let state = state_with(
            MockIdentityResolver::new()
                .with_session("abc", Identity::new("a@x.com", None))
                .with_delay(Duration::from_millis(50)),
        );
        let (client, _rx) = connect(&state, Namespace::App).await;

        let pending = tokio::spawn(authenticate_connection(
            state.registry.clone(),
            state.resolver.clone(),
            client.clone(),
            Some(SessionCredential::new("abc")),
        ));
        state.registry.disconnect(&client).await;

        assert!(!pending.await.unwrap());
        assert_eq!(state.registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn start_edit_before_auth_is_replayed() {
        let state = state_with(
            MockIdentityResolver::new().with_session("abc", Identity::new("a@x.com", None)),
        );
        let (client, _rx) = connect(&state, Namespace::App).await;

        dispatch(&state, &client, Namespace::App, ClientMessage::StartEdit("app1".into())).await;
        assert!(state.registry.rooms_of(&client).await.is_empty());

        authenticate_connection(
            state.registry.clone(),
            state.resolver.clone(),
            client.clone(),
            Some(SessionCredential::new("abc")),
        )
        .await;

        assert_eq!(
            state.registry.rooms_of(&client).await,
            vec![RoomName::new(Namespace::App, "app1")]
        );
    }

    #[tokio::test]
    async fn leave_edit_removes_membership() {
        let state = state_with(MockIdentityResolver::new());
        let (client, _rx) = connect(&state, Namespace::Page).await;
        state
            .registry
            .authenticate(&client, Identity::new("a@x.com", None))
            .await;

        dispatch(&state, &client, Namespace::Page, ClientMessage::StartEdit("p1".into())).await;
        dispatch(&state, &client, Namespace::Page, ClientMessage::LeaveEdit("p1".into())).await;

        assert!(state.registry.rooms_of(&client).await.is_empty());
    }

    #[tokio::test]
    async fn pointer_in_root_namespace_is_ignored() {
        let state = state_with(MockIdentityResolver::new());
        let (a, _a_rx) = connect(&state, Namespace::App).await;
        let (b, mut b_rx) = connect(&state, Namespace::App).await;
        for (client, email) in [(&a, "a@x.com"), (&b, "b@x.com")] {
            state
                .registry
                .authenticate(client, Identity::new(email, None))
                .await;
            dispatch(&state, client, Namespace::App, ClientMessage::StartEdit("app1".into())).await;
        }
        while b_rx.try_recv().is_ok() {}

        let mut position = Map::new();
        position.insert("x".to_string(), json!(1));
        let event = MousePointerEvent {
            user: None,
            socket_id: None,
            position,
        };
        dispatch(&state, &a, Namespace::App, ClientMessage::MousePointer(event)).await;

        assert!(b_rx.try_recv().is_err());
    }
}
