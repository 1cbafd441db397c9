use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::user::OwnerSummary;
use crate::policy::Owned;
use crate::types::{CommentId, UserId, VideoId};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    #[serde(rename = "video")]
    pub video_id: VideoId,
    #[serde(rename = "owner")]
    pub owner_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Comment {
    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub comment: Comment,
    #[sqlx(flatten)]
    #[serde(rename = "ownerDetails")]
    pub owner: OwnerSummary,
    pub likes_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(
        length(max = 2000),
        custom(function = "crate::validation::validate_not_blank")
    )]
    pub content: String,
}
