use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;

use crate::{
    error::AppError,
    handlers::parse_id,
    models::{
        like::{LikeTarget, ToggleLikeResponse},
        user::AuthUser,
        video::VideoCard,
        ApiResponse,
    },
    repositories::{comment as comment_repo, like as like_repo, video as video_repo},
    state::AppState,
    types::{CommentId, VideoId},
};

async fn toggle(
    state: &AppState,
    user: &AuthUser,
    target: LikeTarget,
    target_id: String,
) -> Result<ApiResponse<ToggleLikeResponse>, AppError> {
    let liked = like_repo::toggle_like(&state.pool, target, &target_id, user.id).await?;
    tracing::debug!(user_id = %user.id, target = %target, target_id = %target_id, liked, "Like toggled");

    let response = ToggleLikeResponse {
        liked,
        target_type: target,
        target_id,
    };
    Ok(if liked {
        ApiResponse::new(StatusCode::CREATED, response, "Liked successfully")
    } else {
        ApiResponse::ok(response, "Like removed successfully")
    })
}

pub async fn toggle_video_like(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<ToggleLikeResponse>, AppError> {
    let video_id: VideoId = parse_id(&video_id, "video")?;
    if !video_repo::exists(&state.pool, video_id).await? {
        return Err(AppError::NotFound("Video not found".into()));
    }
    toggle(&state, &user, LikeTarget::Video, video_id.to_string()).await
}

pub async fn toggle_comment_like(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> Result<ApiResponse<ToggleLikeResponse>, AppError> {
    let comment_id: CommentId = parse_id(&comment_id, "comment")?;
    if comment_repo::find_by_id(&state.pool, comment_id).await?.is_none() {
        return Err(AppError::NotFound("Comment not found".into()));
    }
    toggle(&state, &user, LikeTarget::Comment, comment_id.to_string()).await
}

pub async fn liked_videos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<VideoCard>>, AppError> {
    let videos = like_repo::liked_videos(&state.pool, user.id).await?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}
