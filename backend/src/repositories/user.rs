//! Repository functions for user accounts and their refresh-token slot.

use chrono::Utc;

use crate::{
    db::connection::DbPool,
    models::user::{ChannelProfile, NewUser, User},
    types::UserId,
};

const USER_COLUMNS: &str = "id, user_name, email, full_name, password_hash, avatar_url, \
     avatar_public_id, cover_image_url, cover_image_public_id, refresh_token_hash, \
     created_at, updated_at";

pub async fn insert_user(pool: &DbPool, new_user: &NewUser) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    let query = format!(
        "INSERT INTO users (id, user_name, email, full_name, password_hash, avatar_url, \
         avatar_public_id, cover_image_url, cover_image_public_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&query)
        .bind(UserId::new())
        .bind(&new_user.user_name)
        .bind(&new_user.email)
        .bind(&new_user.full_name)
        .bind(&new_user.password_hash)
        .bind(&new_user.avatar_url)
        .bind(&new_user.avatar_public_id)
        .bind(&new_user.cover_image_url)
        .bind(&new_user.cover_image_public_id)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
}

pub async fn find_by_id(pool: &DbPool, id: UserId) -> Result<Option<User>, sqlx::Error> {
    let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    sqlx::query_as::<_, User>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Looks an account up by handle or email, whichever was supplied.
pub async fn find_by_login(
    pool: &DbPool,
    user_name: Option<&str>,
    email: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM users WHERE (?1 IS NOT NULL AND user_name = ?1) \
         OR (?2 IS NOT NULL AND email = ?2) LIMIT 1",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&query)
        .bind(user_name)
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// True when another account already holds the handle or email.
pub async fn identity_taken(
    pool: &DbPool,
    user_name: Option<&str>,
    email: Option<&str>,
    except: Option<UserId>,
) -> Result<bool, sqlx::Error> {
    let taken: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM users WHERE ((?1 IS NOT NULL AND user_name = ?1) \
         OR (?2 IS NOT NULL AND email = ?2)) AND (?3 IS NULL OR id <> ?3) LIMIT 1",
    )
    .bind(user_name)
    .bind(email)
    .bind(except)
    .fetch_optional(pool)
    .await?;
    Ok(taken.is_some())
}

/// Overwrites the stored refresh digest. `None` revokes it.
pub async fn set_refresh_token_hash(
    pool: &DbPool,
    id: UserId,
    digest: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET refresh_token_hash = ?, updated_at = ? WHERE id = ?")
        .bind(digest)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Replaces the refresh digest only if it still equals `expected`.
///
/// Returns `false` when another rotation or a logout got there first.
pub async fn swap_refresh_token_hash(
    pool: &DbPool,
    id: UserId,
    expected: &str,
    replacement: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET refresh_token_hash = ?, updated_at = ? \
         WHERE id = ? AND refresh_token_hash = ?",
    )
    .bind(replacement)
    .bind(Utc::now())
    .bind(id)
    .bind(expected)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Stores a new password hash and drops the refresh token in the same write.
pub async fn update_password(
    pool: &DbPool,
    id: UserId,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET password_hash = ?, refresh_token_hash = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(password_hash)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_account(
    pool: &DbPool,
    id: UserId,
    full_name: Option<&str>,
    user_name: Option<&str>,
    email: Option<&str>,
) -> Result<User, sqlx::Error> {
    let query = format!(
        "UPDATE users SET full_name = COALESCE(?, full_name), user_name = COALESCE(?, user_name), \
         email = COALESCE(?, email), updated_at = ? WHERE id = ? RETURNING {}",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&query)
        .bind(full_name)
        .bind(user_name)
        .bind(email)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn update_avatar(
    pool: &DbPool,
    id: UserId,
    url: &str,
    public_id: &str,
) -> Result<User, sqlx::Error> {
    let query = format!(
        "UPDATE users SET avatar_url = ?, avatar_public_id = ?, updated_at = ? \
         WHERE id = ? RETURNING {}",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&query)
        .bind(url)
        .bind(public_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn update_cover_image(
    pool: &DbPool,
    id: UserId,
    url: &str,
    public_id: &str,
) -> Result<User, sqlx::Error> {
    let query = format!(
        "UPDATE users SET cover_image_url = ?, cover_image_public_id = ?, updated_at = ? \
         WHERE id = ? RETURNING {}",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&query)
        .bind(url)
        .bind(public_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn channel_profile(
    pool: &DbPool,
    user_name: &str,
    viewer: UserId,
) -> Result<Option<ChannelProfile>, sqlx::Error> {
    sqlx::query_as::<_, ChannelProfile>(
        r#"
        SELECT u.id, u.user_name, u.full_name, u.email,
               u.avatar_url AS avatar, u.cover_image_url AS cover_image,
               (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id) AS subscribers_count,
               (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id) AS channels_subscribed_to_count,
               EXISTS(SELECT 1 FROM subscriptions s
                      WHERE s.channel_id = u.id AND s.subscriber_id = ?) AS is_subscribed
        FROM users u
        WHERE u.user_name = ?
        "#,
    )
    .bind(viewer)
    .bind(user_name)
    .fetch_optional(pool)
    .await
}
