use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::{ChatMessageId, UserId, VideoId};

/// A persisted chat line. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub video_id: VideoId,
    pub user_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
