use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Broadcast hub fanning match events out to SSE and WebSocket subscribers.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_sent_after_subscribing() {
        let hub = SseHub::new(4);
        hub.broadcast(ServerEvent::new("match.state", None, "{}".into()));

        let mut receiver = hub.subscribe();
        let id = Uuid::new_v4();
        hub.broadcast(ServerEvent::new("match.deleted", Some(id), "{}".into()));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("match.deleted"));
        assert_eq!(event.match_id, Some(id));
    }
}
