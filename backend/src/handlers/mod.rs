use std::str::FromStr;

use axum::Json;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    services::media::{MediaKind, MediaStore},
};

pub mod chat;
pub mod comments;
pub mod likes;
pub mod subscriptions;
pub mod users;
pub mod videos;

/// Parses a path or body identifier, mapping malformed input to `BadRequest`.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} id", what)))
}

/// Removes a replaced or orphaned media object without failing the request.
pub(crate) async fn destroy_media_quietly(store: &dyn MediaStore, public_id: &str, kind: MediaKind) {
    if let Err(err) = store.destroy(public_id, kind).await {
        tracing::warn!(public_id, error = %err, "Failed to destroy media object");
    }
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
