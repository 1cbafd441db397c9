//! Wire frames: `{"event": <name>, "data": <payload>}` as JSON text.

use serde::{Deserialize, Serialize};

use crate::models::chat::ChatMessage;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientCommand {
    JoinVideoRoom {
        video_id: String,
    },
    ChatMessage {
        video_id: String,
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    PreviousMessages(Vec<ChatMessage>),
    ChatMessage(ChatMessage),
    Error { code: String, message: String },
}

impl ServerEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            tracing::error!("Failed to encode chat event: {}", err);
            r#"{"event":"error","data":{"code":"INTERNAL_SERVER_ERROR","message":"Internal server error"}}"#
                .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessageId, UserId, VideoId};
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn parses_join_and_message_commands() {
        let join: ClientCommand =
            serde_json::from_value(json!({"event": "joinVideoRoom", "data": {"videoId": "v1"}}))
                .unwrap();
        assert_eq!(
            join,
            ClientCommand::JoinVideoRoom {
                video_id: "v1".into()
            }
        );

        let message: ClientCommand = serde_json::from_value(json!({
            "event": "chatMessage",
            "data": {"videoId": "v1", "userId": "u1", "text": "hello"}
        }))
        .unwrap();
        assert_eq!(
            message,
            ClientCommand::ChatMessage {
                video_id: "v1".into(),
                user_id: Some("u1".into()),
                text: "hello".into()
            }
        );
    }

    #[test]
    fn missing_text_defaults_to_empty() {
        let message: ClientCommand = serde_json::from_value(json!({
            "event": "chatMessage",
            "data": {"videoId": "v1"}
        }))
        .unwrap();
        assert!(matches!(message, ClientCommand::ChatMessage { text, user_id: None, .. } if text.is_empty()));
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(serde_json::from_value::<ClientCommand>(json!({"event": "typing", "data": {}})).is_err());
    }

    #[test]
    fn server_events_use_event_and_data_keys() {
        let message = ChatMessage {
            id: ChatMessageId::new(),
            video_id: VideoId::new(),
            user_id: UserId::new(),
            text: "hi".into(),
            created_at: Utc::now(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&ServerEvent::ChatMessage(message.clone()).to_json()).unwrap();
        assert_eq!(value["event"], "chatMessage");
        assert_eq!(value["data"]["text"], "hi");
        assert_eq!(value["data"]["videoId"], message.video_id.to_string());

        let value: serde_json::Value =
            serde_json::from_str(&ServerEvent::PreviousMessages(vec![]).to_json()).unwrap();
        assert_eq!(value["event"], "previousMessages");
        assert_eq!(value["data"], json!([]));

        let value: serde_json::Value = serde_json::from_str(
            &ServerEvent::Error {
                code: "BAD_REQUEST".into(),
                message: "nope".into(),
            }
            .to_json(),
        )
        .unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["message"], "nope");
    }
}
