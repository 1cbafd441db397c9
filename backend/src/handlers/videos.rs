use axum::{
    extract::{Extension, FromRequest, Multipart, Path, Query, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    handlers::{destroy_media_quietly, parse_id},
    models::{
        user::AuthUser,
        video::{NewVideo, UpdateVideoRequest, Video, VideoCard, VideoChanges, VideoListQuery},
        ApiResponse, PageQuery, Paginated,
    },
    policy::ensure_owner,
    repositories::{video as video_repo, video::VideoFilter, watch_history as history_repo},
    services::media::MediaKind,
    state::AppState,
    types::{UserId, VideoId},
    utils::upload::{read_multipart, StagedFile},
};

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 5000;

pub async fn list_videos(
    State(state): State<AppState>,
    Query(params): Query<VideoListQuery>,
) -> Result<ApiResponse<Paginated<VideoCard>>, AppError> {
    let page = PageQuery {
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(10),
    };
    let owner = match params.user_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_id::<UserId>(raw, "user")?),
        _ => None,
    };
    let filter = VideoFilter {
        text: params
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty()),
        owner,
        sort_by: params.sort_by.unwrap_or_default(),
        direction: params.sort_type.unwrap_or_default(),
        limit: page.limit(),
        offset: page.offset(),
    };

    let (docs, total) = video_repo::list_published(&state.pool, &filter).await?;
    Ok(ApiResponse::ok(
        Paginated::new(docs, total, &page),
        "Videos fetched successfully",
    ))
}

fn check_text(value: &str, field: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::Validation(vec![format!(
            "{}: must be at most {} characters",
            field, max
        )]));
    }
    Ok(())
}

pub async fn publish_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<ApiResponse<Video>, AppError> {
    let mut form = read_multipart(multipart, &state.config.upload_tmp_dir).await?;

    let (Some(title), Some(description)) = (form.text("title"), form.text("description")) else {
        return Err(AppError::BadRequest("Title and description are required".into()));
    };
    let (title, description) = (title.to_string(), description.to_string());
    check_text(&title, "title", MAX_TITLE_CHARS)?;
    check_text(&description, "description", MAX_DESCRIPTION_CHARS)?;

    let video_file = form
        .take_file("videoFile")
        .ok_or_else(|| AppError::BadRequest("Video file is required".into()))?;
    let thumbnail_file = form
        .take_file("thumbnail")
        .ok_or_else(|| AppError::BadRequest("Thumbnail is required".into()))?;

    let stored_video = state
        .media
        .upload(&video_file, MediaKind::Video)
        .await
        .map_err(AppError::InternalServerError)?;
    let stored_thumbnail = match state.media.upload(&thumbnail_file, MediaKind::Image).await {
        Ok(stored) => stored,
        Err(err) => {
            destroy_media_quietly(state.media.as_ref(), &stored_video.public_id, MediaKind::Video)
                .await;
            return Err(AppError::InternalServerError(err));
        }
    };

    let new_video = NewVideo {
        owner_id: user.id,
        title,
        description,
        video_url: stored_video.url.clone(),
        video_public_id: stored_video.public_id.clone(),
        thumbnail_url: stored_thumbnail.url.clone(),
        thumbnail_public_id: stored_thumbnail.public_id.clone(),
        duration: stored_video.duration.unwrap_or(0.0),
    };

    let video = match video_repo::insert_video(&state.pool, &new_video).await {
        Ok(video) => video,
        Err(err) => {
            destroy_media_quietly(state.media.as_ref(), &stored_video.public_id, MediaKind::Video)
                .await;
            destroy_media_quietly(
                state.media.as_ref(),
                &stored_thumbnail.public_id,
                MediaKind::Image,
            )
            .await;
            return Err(err.into());
        }
    };

    tracing::info!(video_id = %video.id, owner_id = %user.id, "Video published");
    Ok(ApiResponse::created(video, "Video published successfully"))
}

pub async fn get_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<VideoCard>, AppError> {
    let video_id: VideoId = parse_id(&video_id, "video")?;

    let mut card = video_repo::find_card(&state.pool, video_id)
        .await?
        .filter(|card| card.video.is_published || card.video.owner_id == user.id)
        .ok_or_else(|| AppError::NotFound("Video not found".into()))?;

    video_repo::increment_views(&state.pool, video_id).await?;
    history_repo::record_view(&state.pool, user.id, video_id).await?;

    card.video.views += 1;
    Ok(ApiResponse::ok(card, "Video fetched successfully"))
}

/// Text edits plus an optional replacement thumbnail, from either body form.
async fn read_video_changes(
    state: &AppState,
    request: Request,
) -> Result<(UpdateVideoRequest, Option<StagedFile>), AppError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let mut form = read_multipart(multipart, &state.config.upload_tmp_dir).await?;
        let fields = UpdateVideoRequest {
            title: form.text("title").map(str::to_string),
            description: form.text("description").map(str::to_string),
        };
        Ok((fields, form.take_file("thumbnail")))
    } else {
        let Json(fields) = Json::<UpdateVideoRequest>::from_request(request, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let trimmed = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Ok((
            UpdateVideoRequest {
                title: trimmed(fields.title),
                description: trimmed(fields.description),
            },
            None,
        ))
    }
}

pub async fn update_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
    request: Request,
) -> Result<ApiResponse<Video>, AppError> {
    let video_id: VideoId = parse_id(&video_id, "video")?;
    let (fields, thumbnail_file) = read_video_changes(&state, request).await?;

    let mut changes = VideoChanges {
        title: fields.title,
        description: fields.description,
        thumbnail: None,
    };
    if changes.is_empty() && thumbnail_file.is_none() {
        return Err(AppError::BadRequest(
            "Provide a title, description or thumbnail to update".into(),
        ));
    }
    if let Some(title) = &changes.title {
        check_text(title, "title", MAX_TITLE_CHARS)?;
    }
    if let Some(description) = &changes.description {
        check_text(description, "description", MAX_DESCRIPTION_CHARS)?;
    }

    let existing = ensure_owner(
        user.id,
        video_repo::find_by_id(&state.pool, video_id).await?,
        "Video",
    )?;

    let mut uploaded = None;
    if let Some(file) = &thumbnail_file {
        let stored = state
            .media
            .upload(file, MediaKind::Image)
            .await
            .map_err(AppError::InternalServerError)?;
        changes.thumbnail = Some((stored.url.clone(), stored.public_id.clone()));
        uploaded = Some(stored);
    }

    let updated = match video_repo::update_video(&state.pool, video_id, &changes).await {
        Ok(updated) => updated,
        Err(err) => {
            if let Some(stored) = &uploaded {
                destroy_media_quietly(state.media.as_ref(), &stored.public_id, MediaKind::Image)
                    .await;
            }
            return Err(err.into());
        }
    };

    if uploaded.is_some() && !existing.thumbnail_public_id.is_empty() {
        destroy_media_quietly(
            state.media.as_ref(),
            &existing.thumbnail_public_id,
            MediaKind::Image,
        )
        .await;
    }

    Ok(ApiResponse::ok(updated, "Video updated successfully"))
}

pub async fn delete_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let video_id: VideoId = parse_id(&video_id, "video")?;
    let video = ensure_owner(
        user.id,
        video_repo::find_by_id(&state.pool, video_id).await?,
        "Video",
    )?;

    if !video_repo::delete_video(&state.pool, video_id).await? {
        return Err(AppError::NotFound("Video not found".into()));
    }

    destroy_media_quietly(state.media.as_ref(), &video.video_public_id, MediaKind::Video).await;
    destroy_media_quietly(
        state.media.as_ref(),
        &video.thumbnail_public_id,
        MediaKind::Image,
    )
    .await;

    tracing::info!(video_id = %video_id, owner_id = %user.id, "Video deleted");
    Ok(ApiResponse::ok(
        json!({ "videoId": video_id }),
        "Video deleted successfully",
    ))
}

pub async fn toggle_publish_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Video>, AppError> {
    let video_id: VideoId = parse_id(&video_id, "video")?;
    ensure_owner(
        user.id,
        video_repo::find_by_id(&state.pool, video_id).await?,
        "Video",
    )?;

    let video = video_repo::toggle_publish(&state.pool, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".into()))?;

    tracing::info!(video_id = %video_id, is_published = video.is_published, "Publish status toggled");
    Ok(ApiResponse::ok(video, "Publish status toggled successfully"))
}
