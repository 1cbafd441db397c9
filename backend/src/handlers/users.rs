use axum::{
    body::Bytes,
    extract::{Extension, Multipart, Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::destroy_media_quietly,
    models::{
        user::{
            AuthUser, ChangePasswordRequest, ChannelProfile, LoginRequest, LoginResponse, NewUser,
            RefreshRequest, RegisterFields, TokenPairResponse, UpdateAccountRequest,
        },
        video::VideoCard,
        ApiResponse,
    },
    policy::ensure_owner,
    repositories::{user as user_repo, watch_history as history_repo},
    services::media::MediaKind,
    state::AppState,
    utils::{
        cookies::{clear_token_cookies, cookie_from_headers, set_token_cookies, REFRESH_COOKIE_NAME},
        password::{hash_password, verify_password},
        upload::read_multipart,
    },
};

pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<ApiResponse<AuthUser>, AppError> {
    let mut form = read_multipart(multipart, &state.config.upload_tmp_dir).await?;

    let (Some(full_name), Some(user_name), Some(email), Some(password)) = (
        form.text("fullName"),
        form.text("userName"),
        form.text("email"),
        form.text("password"),
    ) else {
        return Err(AppError::BadRequest("All fields are required".into()));
    };
    let fields = RegisterFields {
        full_name: full_name.to_string(),
        user_name: user_name.to_lowercase(),
        email: email.to_lowercase(),
        password: password.to_string(),
    };
    fields.validate()?;

    if user_repo::identity_taken(
        &state.pool,
        Some(&fields.user_name),
        Some(&fields.email),
        None,
    )
    .await?
    {
        return Err(AppError::Conflict(
            "User with email or username already exists".into(),
        ));
    }

    let avatar_file = form
        .take_file("avatar")
        .ok_or_else(|| AppError::BadRequest("Avatar file is required".into()))?;
    let cover_file = form.take_file("coverImage");

    let avatar = state
        .media
        .upload(&avatar_file, MediaKind::Image)
        .await
        .map_err(AppError::InternalServerError)?;
    let cover = match &cover_file {
        Some(file) => match state.media.upload(file, MediaKind::Image).await {
            Ok(stored) => Some(stored),
            Err(err) => {
                destroy_media_quietly(state.media.as_ref(), &avatar.public_id, MediaKind::Image).await;
                return Err(AppError::InternalServerError(err));
            }
        },
        None => None,
    };

    let new_user = NewUser {
        user_name: fields.user_name,
        email: fields.email,
        full_name: fields.full_name,
        password_hash: hash_password(&fields.password)?,
        avatar_url: avatar.url,
        avatar_public_id: avatar.public_id.clone(),
        cover_image_url: cover.as_ref().map(|c| c.url.clone()),
        cover_image_public_id: cover.as_ref().map(|c| c.public_id.clone()),
    };

    let user = match user_repo::insert_user(&state.pool, &new_user).await {
        Ok(user) => user,
        Err(err) => {
            destroy_media_quietly(state.media.as_ref(), &avatar.public_id, MediaKind::Image).await;
            if let Some(cover) = &cover {
                destroy_media_quietly(state.media.as_ref(), &cover.public_id, MediaKind::Image).await;
            }
            return Err(match AppError::from(err) {
                AppError::Conflict(_) => {
                    AppError::Conflict("User with email or username already exists".into())
                }
                other => other,
            });
        }
    };

    tracing::info!(user_id = %user.id, user_name = %user.user_name, "User registered");
    Ok(ApiResponse::created(
        AuthUser::from(user),
        "User registered successfully",
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, ApiResponse<LoginResponse>), AppError> {
    let user_name = payload
        .user_name
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase);
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase);
    if user_name.is_none() && email.is_none() {
        return Err(AppError::BadRequest("Username or email is required".into()));
    }

    let user = user_repo::find_by_login(&state.pool, user_name.as_deref(), email.as_deref())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid user credentials".into()))?;
    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AppError::Unauthorized("Invalid user credentials".into()));
    }

    let pair = state.tokens.issue_token_pair(&state.pool, &user).await?;
    let mut headers = HeaderMap::new();
    set_token_cookies(
        &mut headers,
        &pair.access_token,
        state.tokens.access_ttl(),
        &pair.refresh_token,
        state.tokens.refresh_ttl(),
        state.cookie_options(),
    );

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((
        headers,
        ApiResponse::ok(
            LoginResponse {
                user: AuthUser::from(user),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<(HeaderMap, ApiResponse<Value>), AppError> {
    state.tokens.revoke(&state.pool, user.id).await?;

    let mut headers = HeaderMap::new();
    clear_token_cookies(&mut headers, state.cookie_options());

    tracing::info!(user_id = %user.id, "User logged out");
    Ok((headers, ApiResponse::ok(json!({}), "User logged out")))
}

pub async fn refresh_access_token(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    body: Bytes,
) -> Result<(HeaderMap, ApiResponse<TokenPairResponse>), AppError> {
    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|_| AppError::BadRequest("Invalid request body".into()))?
            .refresh_token
    };
    let presented = cookie_from_headers(&request_headers, REFRESH_COOKIE_NAME)
        .or(from_body)
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".into()))?;

    let (user, pair) = state
        .tokens
        .rotate_from_refresh(&state.pool, presented.trim())
        .await?;

    let mut headers = HeaderMap::new();
    set_token_cookies(
        &mut headers,
        &pair.access_token,
        state.tokens.access_ttl(),
        &pair.refresh_token,
        state.tokens.refresh_ttl(),
        state.cookie_options(),
    );

    tracing::debug!(user_id = %user.id, "Refresh token rotated");
    Ok((
        headers,
        ApiResponse::ok(
            TokenPairResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "Access token refreshed",
        ),
    ))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<ApiResponse<Value>, AppError> {
    payload.validate()?;

    let record = user_repo::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    if !verify_password(&payload.old_password, &record.password_hash)? {
        return Err(AppError::BadRequest("Invalid old password".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    user_repo::update_password(&state.pool, user.id, &new_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

pub async fn current_user(Extension(user): Extension<AuthUser>) -> ApiResponse<AuthUser> {
    ApiResponse::ok(user, "Current user fetched successfully")
}

fn normalized(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

pub async fn update_account_details(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<ApiResponse<AuthUser>, AppError> {
    let payload = UpdateAccountRequest {
        full_name: normalized(payload.full_name),
        user_name: normalized(payload.user_name).map(|v| v.to_lowercase()),
        email: normalized(payload.email).map(|v| v.to_lowercase()),
    };
    if payload.full_name.is_none() && payload.user_name.is_none() && payload.email.is_none() {
        return Err(AppError::BadRequest("At least one field is required".into()));
    }
    payload.validate()?;

    if (payload.user_name.is_some() || payload.email.is_some())
        && user_repo::identity_taken(
            &state.pool,
            payload.user_name.as_deref(),
            payload.email.as_deref(),
            Some(user.id),
        )
        .await?
    {
        return Err(AppError::Conflict(
            "User with email or username already exists".into(),
        ));
    }

    let updated = user_repo::update_account(
        &state.pool,
        user.id,
        payload.full_name.as_deref(),
        payload.user_name.as_deref(),
        payload.email.as_deref(),
    )
    .await?;

    Ok(ApiResponse::ok(
        AuthUser::from(updated),
        "Account details updated successfully",
    ))
}

#[derive(Clone, Copy)]
enum ProfileImage {
    Avatar,
    Cover,
}

async fn replace_profile_image(
    state: &AppState,
    actor: &AuthUser,
    multipart: Multipart,
    slot: ProfileImage,
) -> Result<AuthUser, AppError> {
    let (field, label) = match slot {
        ProfileImage::Avatar => ("avatar", "Avatar"),
        ProfileImage::Cover => ("coverImage", "Cover image"),
    };
    let mut form = read_multipart(multipart, &state.config.upload_tmp_dir).await?;
    let file = form
        .take_file(field)
        .ok_or_else(|| AppError::BadRequest(format!("{} file is missing", label)))?;

    let record = ensure_owner(
        actor.id,
        user_repo::find_by_id(&state.pool, actor.id).await?,
        "User",
    )?;

    let stored = state
        .media
        .upload(&file, MediaKind::Image)
        .await
        .map_err(AppError::InternalServerError)?;

    let (result, previous) = match slot {
        ProfileImage::Avatar => (
            user_repo::update_avatar(&state.pool, actor.id, &stored.url, &stored.public_id).await,
            Some(record.avatar_public_id),
        ),
        ProfileImage::Cover => (
            user_repo::update_cover_image(&state.pool, actor.id, &stored.url, &stored.public_id)
                .await,
            record.cover_image_public_id,
        ),
    };
    let updated = match result {
        Ok(updated) => updated,
        Err(err) => {
            destroy_media_quietly(state.media.as_ref(), &stored.public_id, MediaKind::Image).await;
            return Err(err.into());
        }
    };

    if let Some(previous) = previous.filter(|id| !id.is_empty()) {
        destroy_media_quietly(state.media.as_ref(), &previous, MediaKind::Image).await;
    }

    Ok(AuthUser::from(updated))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<ApiResponse<AuthUser>, AppError> {
    let updated = replace_profile_image(&state, &user, multipart, ProfileImage::Avatar).await?;
    Ok(ApiResponse::ok(updated, "Avatar image updated successfully"))
}

pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<ApiResponse<AuthUser>, AppError> {
    let updated = replace_profile_image(&state, &user, multipart, ProfileImage::Cover).await?;
    Ok(ApiResponse::ok(updated, "Cover image updated successfully"))
}

pub async fn channel_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_name): Path<String>,
) -> Result<ApiResponse<ChannelProfile>, AppError> {
    let user_name = user_name.trim().to_lowercase();
    if user_name.is_empty() {
        return Err(AppError::BadRequest("Username is missing".into()));
    }

    let profile = user_repo::channel_profile(&state.pool, &user_name, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Channel does not exist".into()))?;

    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

pub async fn watch_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<VideoCard>>, AppError> {
    let history = history_repo::list_for_user(&state.pool, user.id).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
