use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from viewer WebSocket clients.
#[serde(tag = "type")]
pub enum ViewerInboundMessage {
    /// Follow one match; the server answers with its current state.
    #[serde(rename = "join")]
    Join {
        /// Match to follow.
        match_id: Uuid,
    },
}

#[derive(Debug, Serialize)]
/// Message pushed to viewers: `{"type": "state" | "finished" | ..., "data": ...}`.
pub struct ViewerOutboundMessage<'a> {
    /// Message type.
    #[serde(rename = "type")]
    pub kind: &'a str,
    /// Event payload, usually a match snapshot.
    pub data: Value,
}

#[derive(Debug, Serialize, ToSchema)]
/// Error notice sent before closing a viewer socket.
pub struct ViewerError {
    /// Always `error`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Reason shown to the viewer.
    pub message: String,
}

impl ViewerError {
    /// Build an error notice.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: "error".into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_message_is_tagged_by_type() {
        let id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"join","match_id":"{id}"}}"#);
        let parsed: ViewerInboundMessage = serde_json::from_str(&raw).unwrap();
        assert!(matches!(parsed, ViewerInboundMessage::Join { match_id } if match_id == id));

        assert!(serde_json::from_str::<ViewerInboundMessage>(r#"{"type":"ping"}"#).is_err());
    }

    #[test]
    fn outbound_message_wraps_payload() {
        let message = ViewerOutboundMessage {
            kind: "state",
            data: serde_json::json!({ "id": 1 }),
        };
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"type":"state","data":{"id":1}}"#
        );
    }
}
