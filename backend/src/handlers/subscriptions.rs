use axum::extract::{Extension, Path, State};

use crate::{
    error::AppError,
    handlers::parse_id,
    models::{
        subscription::{SubscriptionEntry, ToggleSubscriptionResponse},
        user::AuthUser,
        ApiResponse,
    },
    repositories::{subscription as subscription_repo, user as user_repo},
    state::AppState,
    types::UserId,
};

pub async fn toggle_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<ToggleSubscriptionResponse>, AppError> {
    let channel_id: UserId = parse_id(&channel_id, "channel")?;
    if channel_id == user.id {
        return Err(AppError::BadRequest(
            "You cannot subscribe to your own channel".into(),
        ));
    }
    if user_repo::find_by_id(&state.pool, channel_id).await?.is_none() {
        return Err(AppError::NotFound("Channel not found".into()));
    }

    let subscribed =
        subscription_repo::toggle_subscription(&state.pool, user.id, channel_id).await?;
    let message = if subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(
        ToggleSubscriptionResponse {
            subscribed,
            channel_id,
        },
        message,
    ))
}

pub async fn channel_subscribers(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<Vec<SubscriptionEntry>>, AppError> {
    let channel_id: UserId = parse_id(&channel_id, "channel")?;
    let subscribers = subscription_repo::subscribers_of(&state.pool, channel_id).await?;
    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}

pub async fn subscribed_channels(
    State(state): State<AppState>,
    Path(subscriber_id): Path<String>,
) -> Result<ApiResponse<Vec<SubscriptionEntry>>, AppError> {
    let subscriber_id: UserId = parse_id(&subscriber_id, "subscriber")?;
    let channels = subscription_repo::channels_of(&state.pool, subscriber_id).await?;
    Ok(ApiResponse::ok(
        channels,
        "Subscribed channels fetched successfully",
    ))
}
