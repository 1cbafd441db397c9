//! Repository functions for videos.

use chrono::Utc;

use super::VIDEO_CARD_COLUMNS;
use crate::{
    db::connection::DbPool,
    models::video::{NewVideo, SortDirection, Video, VideoCard, VideoChanges, VideoSortField},
    types::{UserId, VideoId},
};

const VIDEO_COLUMNS: &str = "id, owner_id, title, description, video_url, video_public_id, \
     thumbnail_url, thumbnail_public_id, duration, views, is_published, created_at, updated_at";

/// Filters for the public listing.
#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    pub text: Option<String>,
    pub owner: Option<UserId>,
    pub sort_by: VideoSortField,
    pub direction: SortDirection,
    pub limit: i64,
    pub offset: i64,
}

pub async fn insert_video(pool: &DbPool, new_video: &NewVideo) -> Result<Video, sqlx::Error> {
    let now = Utc::now();
    let query = format!(
        "INSERT INTO videos (id, owner_id, title, description, video_url, video_public_id, \
         thumbnail_url, thumbnail_public_id, duration, views, is_published, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 1, ?, ?) RETURNING {}",
        VIDEO_COLUMNS
    );
    sqlx::query_as::<_, Video>(&query)
        .bind(VideoId::new())
        .bind(new_video.owner_id)
        .bind(&new_video.title)
        .bind(&new_video.description)
        .bind(&new_video.video_url)
        .bind(&new_video.video_public_id)
        .bind(&new_video.thumbnail_url)
        .bind(&new_video.thumbnail_public_id)
        .bind(new_video.duration)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
}

pub async fn find_by_id(pool: &DbPool, id: VideoId) -> Result<Option<Video>, sqlx::Error> {
    let query = format!("SELECT {} FROM videos WHERE id = ?", VIDEO_COLUMNS);
    sqlx::query_as::<_, Video>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn exists(pool: &DbPool, id: VideoId) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM videos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn find_card(pool: &DbPool, id: VideoId) -> Result<Option<VideoCard>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM videos v JOIN users u ON u.id = v.owner_id WHERE v.id = ?",
        VIDEO_CARD_COLUMNS
    );
    sqlx::query_as::<_, VideoCard>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// `LIKE` pattern matching `text` literally anywhere in the column.
fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Published videos matching the filter, plus the total match count.
pub async fn list_published(
    pool: &DbPool,
    filter: &VideoFilter,
) -> Result<(Vec<VideoCard>, i64), sqlx::Error> {
    let pattern = filter.text.as_deref().map(contains_pattern);
    let condition = "v.is_published = 1 \
         AND (?1 IS NULL OR v.title LIKE ?1 ESCAPE '\\' OR v.description LIKE ?1 ESCAPE '\\') \
         AND (?2 IS NULL OR v.owner_id = ?2)";

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM videos v WHERE {}",
        condition
    ))
    .bind(&pattern)
    .bind(filter.owner)
    .fetch_one(pool)
    .await?;

    // Sort column and direction come from closed enums, never from raw input.
    let query = format!(
        "SELECT {} FROM videos v JOIN users u ON u.id = v.owner_id WHERE {} \
         ORDER BY {} {}, v.rowid DESC LIMIT ?3 OFFSET ?4",
        VIDEO_CARD_COLUMNS,
        condition,
        filter.sort_by.column(),
        filter.direction.keyword()
    );
    let docs = sqlx::query_as::<_, VideoCard>(&query)
        .bind(&pattern)
        .bind(filter.owner)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await?;

    Ok((docs, total))
}

pub async fn increment_views(pool: &DbPool, id: VideoId) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE videos SET views = views + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_video(
    pool: &DbPool,
    id: VideoId,
    changes: &VideoChanges,
) -> Result<Video, sqlx::Error> {
    let (thumbnail_url, thumbnail_public_id) = match &changes.thumbnail {
        Some((url, public_id)) => (Some(url.as_str()), Some(public_id.as_str())),
        None => (None, None),
    };
    let query = format!(
        "UPDATE videos SET title = COALESCE(?, title), description = COALESCE(?, description), \
         thumbnail_url = COALESCE(?, thumbnail_url), \
         thumbnail_public_id = COALESCE(?, thumbnail_public_id), updated_at = ? \
         WHERE id = ? RETURNING {}",
        VIDEO_COLUMNS
    );
    sqlx::query_as::<_, Video>(&query)
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(thumbnail_url)
        .bind(thumbnail_public_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Flips the publish flag in a single statement.
pub async fn toggle_publish(pool: &DbPool, id: VideoId) -> Result<Option<Video>, sqlx::Error> {
    let query = format!(
        "UPDATE videos SET is_published = NOT is_published, updated_at = ? WHERE id = ? RETURNING {}",
        VIDEO_COLUMNS
    );
    sqlx::query_as::<_, Video>(&query)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Removes a video with its comments, likes, chat messages and history entries.
pub async fn delete_video(pool: &DbPool, id: VideoId) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM likes WHERE (target_type = 'video' AND target_id = ?1) \
         OR (target_type = 'comment' AND target_id IN (SELECT id FROM comments WHERE video_id = ?1))",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    for statement in [
        "DELETE FROM comments WHERE video_id = ?",
        "DELETE FROM chat_messages WHERE video_id = ?",
        "DELETE FROM watch_history WHERE video_id = ?",
    ] {
        sqlx::query(statement).bind(id).execute(&mut *tx).await?;
    }

    let deleted = sqlx::query("DELETE FROM videos WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::contains_pattern;

    #[test]
    fn wildcards_in_search_text_match_literally() {
        assert_eq!(contains_pattern("intro"), "%intro%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }
}
