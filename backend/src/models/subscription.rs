use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::user::OwnerSummary;
use crate::types::UserId;

/// A user on the other end of a subscription, with when it started.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: OwnerSummary,
    pub subscribed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleSubscriptionResponse {
    pub subscribed: bool,
    pub channel_id: UserId,
}
