use chrono::Utc;

use super::VIDEO_CARD_COLUMNS;
use crate::{
    db::connection::DbPool,
    models::video::VideoCard,
    types::{UserId, VideoId},
};

/// Moves the video to the front of the user's history.
pub async fn record_view(pool: &DbPool, user_id: UserId, video_id: VideoId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO watch_history (user_id, video_id, watched_at) VALUES (?, ?, ?) \
         ON CONFLICT (user_id, video_id) DO UPDATE SET watched_at = excluded.watched_at",
    )
    .bind(user_id)
    .bind(video_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_for_user(pool: &DbPool, user_id: UserId) -> Result<Vec<VideoCard>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM watch_history w \
         JOIN videos v ON v.id = w.video_id \
         JOIN users u ON u.id = v.owner_id \
         WHERE w.user_id = ? \
         ORDER BY w.watched_at DESC, w.rowid DESC",
        VIDEO_CARD_COLUMNS
    );
    sqlx::query_as::<_, VideoCard>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await
}
