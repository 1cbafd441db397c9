use axum::extract::{Path, State};

use crate::{
    error::AppError,
    handlers::parse_id,
    models::{chat::ChatMessage, ApiResponse},
    repositories::{chat as chat_repo, video as video_repo},
    state::AppState,
    types::VideoId,
};

/// Full chat history for a video, oldest first.
pub async fn chat_history(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Vec<ChatMessage>>, AppError> {
    let video_id: VideoId = parse_id(&video_id, "video")?;
    if !video_repo::exists(&state.pool, video_id).await? {
        return Err(AppError::NotFound("Video not found".into()));
    }

    let messages = chat_repo::list_for_video(&state.pool, video_id).await?;
    Ok(ApiResponse::ok(messages, "Chat messages fetched successfully"))
}
