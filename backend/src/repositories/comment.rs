use chrono::Utc;

use crate::{
    db::connection::DbPool,
    models::comment::{Comment, CommentView},
    types::{CommentId, UserId, VideoId},
};

const COMMENT_COLUMNS: &str = "id, video_id, owner_id, content, created_at, updated_at";

pub async fn list_for_video(
    pool: &DbPool,
    video_id: VideoId,
    limit: i64,
    offset: i64,
) -> Result<(Vec<CommentView>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE video_id = ?")
        .bind(video_id)
        .fetch_one(pool)
        .await?;

    let docs = sqlx::query_as::<_, CommentView>(
        r#"
        SELECT c.id, c.video_id, c.owner_id, c.content, c.created_at, c.updated_at,
               u.user_name AS owner_user_name, u.full_name AS owner_full_name,
               u.avatar_url AS owner_avatar,
               (SELECT COUNT(*) FROM likes l
                WHERE l.target_type = 'comment' AND l.target_id = c.id) AS likes_count
        FROM comments c
        JOIN users u ON u.id = c.owner_id
        WHERE c.video_id = ?
        ORDER BY c.created_at ASC, c.rowid ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(video_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((docs, total))
}

pub async fn insert_comment(
    pool: &DbPool,
    video_id: VideoId,
    owner_id: UserId,
    content: &str,
) -> Result<Comment, sqlx::Error> {
    let now = Utc::now();
    let query = format!(
        "INSERT INTO comments (id, video_id, owner_id, content, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING {}",
        COMMENT_COLUMNS
    );
    sqlx::query_as::<_, Comment>(&query)
        .bind(CommentId::new())
        .bind(video_id)
        .bind(owner_id)
        .bind(content)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
}

pub async fn find_by_id(pool: &DbPool, id: CommentId) -> Result<Option<Comment>, sqlx::Error> {
    let query = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
    sqlx::query_as::<_, Comment>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update_content(
    pool: &DbPool,
    id: CommentId,
    content: &str,
) -> Result<Comment, sqlx::Error> {
    let query = format!(
        "UPDATE comments SET content = ?, updated_at = ? WHERE id = ? RETURNING {}",
        COMMENT_COLUMNS
    );
    sqlx::query_as::<_, Comment>(&query)
        .bind(content)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Deletes a comment and the likes pointing at it.
pub async fn delete_comment(pool: &DbPool, id: CommentId) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM likes WHERE target_type = 'comment' AND target_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;
    Ok(deleted > 0)
}
