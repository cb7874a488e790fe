//! Pointer relay for the page-edit namespace.

use std::sync::Arc;

use crate::domain::room::Namespace;

use super::messages::{MousePointerEvent, ServerMessage};
use super::registry::{ClientId, RoomRegistry};

/// Relays cursor positions to the other editors of the sender's page.
///
/// The sender's identity and transport id are stamped onto every event,
/// overwriting whatever the client claimed.
#[derive(Clone)]
pub struct PointerRelay {
    registry: Arc<RoomRegistry>,
}

impl PointerRelay {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Forward `event` from `sender`. Returns the number of recipients.
    ///
    /// Unauthenticated senders and senders outside any page room are
    /// dropped without a reply.
    pub async fn relay(&self, sender: &ClientId, mut event: MousePointerEvent) -> usize {
        let Some((identity, room)) = self
            .registry
            .sender_context(sender, Namespace::Page)
            .await
        else {
            tracing::trace!(client_id = %sender, "Pointer event without page room dropped");
            return 0;
        };

        event.user = Some(identity);
        event.socket_id = Some(sender.to_string());

        self.registry
            .emit_to_room_except(&room, sender, ServerMessage::MousePointer(event))
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};
    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::identity::Identity;

    fn pointer(x: i64, y: i64) -> MousePointerEvent {
        let mut position = Map::new();
        position.insert("x".to_string(), json!(x));
        position.insert("y".to_string(), json!(y));
        MousePointerEvent {
            user: None,
            socket_id: None,
            position,
        }
    }

    async fn page_editor(
        registry: &RoomRegistry,
        email: &str,
        page: &str,
    ) -> (ClientId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(16);
        let client = registry.connect(Namespace::Page, tx).await;
        registry
            .authenticate(&client, Identity::new(email, Some(email.to_uppercase())))
            .await;
        registry.request_join(&client, page, Namespace::Page).await;
        (client, rx)
    }

    #[tokio::test]
    async fn relays_to_room_peers_with_sender_stamped() {
        let registry = Arc::new(RoomRegistry::with_presence());
        let relay = PointerRelay::new(registry.clone());
        let (alice, mut alice_rx) = page_editor(&registry, "alice@x.com", "p1").await;
        let (_bob, mut bob_rx) = page_editor(&registry, "bob@x.com", "p1").await;

        let mut forged = pointer(3, 4);
        forged.user = Some(Identity::new("mallory@x.com", None));
        forged.socket_id = Some("forged".to_string());
        let sent = relay.relay(&alice, forged).await;

        assert_eq!(sent, 1);
        let Ok(ServerMessage::MousePointer(event)) = bob_rx.try_recv() else {
            panic!("expected pointer event");
        };
        assert_eq!(event.user.unwrap().email, "alice@x.com");
        assert_eq!(event.socket_id.unwrap(), alice.to_string());
        assert_eq!(event.position["x"], json!(3));
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn other_pages_do_not_receive_pointer() {
        let registry = Arc::new(RoomRegistry::with_presence());
        let relay = PointerRelay::new(registry.clone());
        let (alice, _alice_rx) = page_editor(&registry, "alice@x.com", "p1").await;
        let (_carol, mut carol_rx) = page_editor(&registry, "carol@x.com", "p2").await;

        assert_eq!(relay.relay(&alice, pointer(1, 1)).await, 0);
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unauthenticated_sender_is_dropped() {
        let registry = Arc::new(RoomRegistry::with_presence());
        let relay = PointerRelay::new(registry.clone());
        let (tx, _rx) = mpsc::channel(16);
        let anon = registry.connect(Namespace::Page, tx).await;
        registry.request_join(&anon, "p1", Namespace::Page).await;
        let (_bob, mut bob_rx) = page_editor(&registry, "bob@x.com", "p1").await;

        assert_eq!(relay.relay(&anon, pointer(0, 0)).await, 0);
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn sender_without_room_is_dropped() {
        let registry = Arc::new(RoomRegistry::with_presence());
        let relay = PointerRelay::new(registry.clone());
        let (tx, _rx) = mpsc::channel(16);
        let loner = registry.connect(Namespace::Page, tx).await;
        registry
            .authenticate(&loner, Identity::new("l@x.com", None))
            .await;

        assert_eq!(relay.relay(&loner, pointer(0, 0)).await, 0);
    }
}
