use chrono::Utc;

use super::VIDEO_CARD_COLUMNS;
use crate::{
    db::connection::DbPool,
    models::{like::LikeTarget, video::VideoCard},
    types::{LikeId, UserId},
};

/// Adds the like if absent, removes it if present. Returns whether it is now liked.
pub async fn toggle_like(
    pool: &DbPool,
    target: LikeTarget,
    target_id: &str,
    user_id: UserId,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let removed = sqlx::query(
        "DELETE FROM likes WHERE target_type = ? AND target_id = ? AND liked_by = ?",
    )
    .bind(target)
    .bind(target_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if removed == 0 {
        sqlx::query(
            "INSERT INTO likes (id, target_type, target_id, liked_by, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(LikeId::new())
        .bind(target)
        .bind(target_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(removed == 0)
}

/// Published videos the user liked, most recent like first.
pub async fn liked_videos(pool: &DbPool, user_id: UserId) -> Result<Vec<VideoCard>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM likes l \
         JOIN videos v ON v.id = l.target_id \
         JOIN users u ON u.id = v.owner_id \
         WHERE l.target_type = 'video' AND l.liked_by = ? AND v.is_published = 1 \
         ORDER BY l.created_at DESC, l.rowid DESC",
        VIDEO_CARD_COLUMNS
    );
    sqlx::query_as::<_, VideoCard>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await
}
