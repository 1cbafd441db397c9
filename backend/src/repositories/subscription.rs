use chrono::Utc;

use crate::{
    db::connection::DbPool,
    models::subscription::SubscriptionEntry,
    types::{SubscriptionId, UserId},
};

/// Subscribes or unsubscribes. Returns whether the subscription now exists.
pub async fn toggle_subscription(
    pool: &DbPool,
    subscriber_id: UserId,
    channel_id: UserId,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let removed = sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = ? AND channel_id = ?")
        .bind(subscriber_id)
        .bind(channel_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed == 0 {
        sqlx::query(
            "INSERT INTO subscriptions (id, subscriber_id, channel_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(SubscriptionId::new())
        .bind(subscriber_id)
        .bind(channel_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(removed == 0)
}

pub async fn subscribers_of(
    pool: &DbPool,
    channel_id: UserId,
) -> Result<Vec<SubscriptionEntry>, sqlx::Error> {
    sqlx::query_as::<_, SubscriptionEntry>(
        r#"
        SELECT u.id AS owner_id, u.user_name AS owner_user_name, u.full_name AS owner_full_name,
               u.avatar_url AS owner_avatar, s.created_at AS subscribed_at
        FROM subscriptions s
        JOIN users u ON u.id = s.subscriber_id
        WHERE s.channel_id = ?
        ORDER BY s.created_at DESC, s.rowid DESC
        "#,
    )
    .bind(channel_id)
    .fetch_all(pool)
    .await
}

pub async fn channels_of(
    pool: &DbPool,
    subscriber_id: UserId,
) -> Result<Vec<SubscriptionEntry>, sqlx::Error> {
    sqlx::query_as::<_, SubscriptionEntry>(
        r#"
        SELECT u.id AS owner_id, u.user_name AS owner_user_name, u.full_name AS owner_full_name,
               u.avatar_url AS owner_avatar, s.created_at AS subscribed_at
        FROM subscriptions s
        JOIN users u ON u.id = s.channel_id
        WHERE s.subscriber_id = ?
        ORDER BY s.created_at DESC, s.rowid DESC
        "#,
    )
    .bind(subscriber_id)
    .fetch_all(pool)
    .await
}
