//! Room event schema, explicitly tagged and versioned. Unknown event types
//! and missing required fields fail deserialization instead of being
//! guessed at.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Message;

/// Version stamped into the `connected` handshake acknowledgment.
pub const PROTOCOL_VERSION: u32 = 1;

/// Events a client may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Join { chat_id: Uuid },
    Leave { chat_id: Uuid },
    Send { chat_id: Uuid, content: String },
    Typing { chat_id: Uuid },
    StopTyping { chat_id: Uuid },
}

/// Events the server pushes to a client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        protocol: u32,
        user_id: Uuid,
    },
    Joined {
        chat_id: Uuid,
    },
    /// A persisted message fanned out to the room's other members.
    Message {
        message: Message,
    },
    /// Send acknowledgment to the sender, carrying the persisted message
    /// (server-assigned id and timestamp) for optimistic-state
    /// reconciliation.
    MessageAck {
        message: Message,
    },
    UserTyping {
        chat_id: Uuid,
        user_id: Uuid,
    },
    UserStopTyping {
        chat_id: Uuid,
        user_id: Uuid,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

impl ServerEvent {
    pub fn from_error(err: &AppError) -> Self {
        ServerEvent::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","code":"internal","message":"event serialization failed"}"#.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn parses_join_event() {
        let chat_id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"join","chat_id":"{chat_id}"}}"#);
        let event: ClientEvent = serde_json::from_str(&raw).expect("valid join");
        assert!(matches!(event, ClientEvent::Join { chat_id: id } if id == chat_id));
    }

    #[test]
    fn parses_send_event() {
        let chat_id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"send","chat_id":"{chat_id}","content":"hello"}}"#);
        let event: ClientEvent = serde_json::from_str(&raw).expect("valid send");
        match event {
            ClientEvent::Send { content, .. } => assert_eq!(content, "hello"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_event_type() {
        let raw = r#"{"type":"broadcast_all","chat_id":"00000000-0000-0000-0000-000000000000"}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn rejects_missing_required_field() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"send","content":"hi"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"join"}"#).is_err());
    }

    #[test]
    fn server_events_carry_their_tag() {
        let chat_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let joined = ServerEvent::Joined { chat_id }.to_json();
        assert!(joined.contains(r#""type":"joined""#));

        let typing = ServerEvent::UserTyping { chat_id, user_id }.to_json();
        assert!(typing.contains(r#""type":"user_typing""#));

        let error = ServerEvent::from_error(&AppError::Forbidden).to_json();
        assert!(error.contains(r#""code":"forbidden""#));
    }

    #[test]
    fn message_event_exposes_server_assigned_fields() {
        let message = Message {
            id: Uuid::new_v4(),
            chat_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            content: "hello".into(),
            is_read: false,
            created_at: Utc::now(),
        };
        let json = ServerEvent::Message { message }.to_json();
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["type"], "message");
        assert!(value["message"]["id"].is_string());
        assert!(value["message"]["created_at"].is_string());
    }
}
