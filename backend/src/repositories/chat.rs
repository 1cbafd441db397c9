use chrono::Utc;

use crate::{
    db::connection::DbPool,
    models::chat::ChatMessage,
    types::{ChatMessageId, UserId, VideoId},
};

pub async fn insert_message(
    pool: &DbPool,
    video_id: VideoId,
    user_id: UserId,
    text: &str,
) -> Result<ChatMessage, sqlx::Error> {
    sqlx::query_as::<_, ChatMessage>(
        "INSERT INTO chat_messages (id, video_id, user_id, text, created_at) VALUES (?, ?, ?, ?, ?) \
         RETURNING id, video_id, user_id, text, created_at",
    )
    .bind(ChatMessageId::new())
    .bind(video_id)
    .bind(user_id)
    .bind(text)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

/// Full history for a video, oldest first. Insertion order breaks timestamp ties.
pub async fn list_for_video(pool: &DbPool, video_id: VideoId) -> Result<Vec<ChatMessage>, sqlx::Error> {
    sqlx::query_as::<_, ChatMessage>(
        "SELECT id, video_id, user_id, text, created_at FROM chat_messages \
         WHERE video_id = ? ORDER BY created_at ASC, rowid ASC",
    )
    .bind(video_id)
    .fetch_all(pool)
    .await
}
