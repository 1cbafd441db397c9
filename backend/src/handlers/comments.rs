use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::parse_id,
    models::{
        comment::{Comment, CommentRequest, CommentView},
        user::AuthUser,
        ApiResponse, PageQuery, Paginated,
    },
    policy::ensure_owner,
    repositories::{comment as comment_repo, video as video_repo},
    state::AppState,
    types::{CommentId, VideoId},
};

pub async fn list_comments(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<ApiResponse<Paginated<CommentView>>, AppError> {
    let video_id: VideoId = parse_id(&video_id, "video")?;
    if !video_repo::exists(&state.pool, video_id).await? {
        return Err(AppError::NotFound("Video not found".into()));
    }

    let (docs, total) =
        comment_repo::list_for_video(&state.pool, video_id, page.limit(), page.offset()).await?;
    Ok(ApiResponse::ok(
        Paginated::new(docs, total, &page),
        "Comments fetched successfully",
    ))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
    Json(payload): Json<CommentRequest>,
) -> Result<ApiResponse<Comment>, AppError> {
    payload.validate()?;
    let video_id: VideoId = parse_id(&video_id, "video")?;
    if !video_repo::exists(&state.pool, video_id).await? {
        return Err(AppError::NotFound("Video not found".into()));
    }

    let comment =
        comment_repo::insert_comment(&state.pool, video_id, user.id, payload.content.trim())
            .await?;
    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<String>,
    Json(payload): Json<CommentRequest>,
) -> Result<ApiResponse<Comment>, AppError> {
    payload.validate()?;
    let comment_id: CommentId = parse_id(&comment_id, "comment")?;
    ensure_owner(
        user.id,
        comment_repo::find_by_id(&state.pool, comment_id).await?,
        "Comment",
    )?;

    let comment =
        comment_repo::update_content(&state.pool, comment_id, payload.content.trim()).await?;
    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let comment_id: CommentId = parse_id(&comment_id, "comment")?;
    ensure_owner(
        user.id,
        comment_repo::find_by_id(&state.pool, comment_id).await?,
        "Comment",
    )?;

    if !comment_repo::delete_comment(&state.pool, comment_id).await? {
        return Err(AppError::NotFound("Comment not found".into()));
    }
    Ok(ApiResponse::ok(
        json!({ "commentId": comment_id }),
        "Comment deleted successfully",
    ))
}
