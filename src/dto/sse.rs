use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE and WebSocket channels.
pub struct ServerEvent {
    /// SSE event name.
    pub event: Option<String>,
    /// Match the event belongs to, used by per-match subscribers to filter.
    pub match_id: Option<Uuid>,
    /// JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialised payload.
    pub fn new(event: impl Into<String>, match_id: Option<Uuid>, data: String) -> Self {
        Self {
            event: Some(event.into()),
            match_id,
            data,
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<T>(event: &str, match_id: Option<Uuid>, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self::new(event, match_id, serde_json::to_string(payload)?))
    }

    /// Whether subscribers of `id` should see this event.
    pub fn concerns(&self, id: Uuid) -> bool {
        self.match_id.is_none_or(|match_id| match_id == id)
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`matches` or `match:<id>`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Whether storage is unavailable.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a match has been removed.
pub struct MatchDeletedEvent {
    /// Identifier of the deleted match.
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_events_concern_every_match() {
        let id = Uuid::new_v4();
        let global = ServerEvent::new("system.status", None, "{}".into());
        let tagged = ServerEvent::new("match.state", Some(id), "{}".into());

        assert!(global.concerns(id));
        assert!(tagged.concerns(id));
        assert!(!tagged.concerns(Uuid::new_v4()));
    }
}
