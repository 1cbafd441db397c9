use std::time::Duration;

use anyhow::Context;
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    chat::socket::chat_socket,
    handlers,
    middleware::{self, rate_limit::create_auth_rate_limiter},
    state::AppState,
};

/// Assembles the full application: `/api/v1` routes, health check, media
/// files for the disk store, and the shared middleware stack.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let mut public_routes = Router::new()
        .route("/users/register", post(handlers::users::register))
        .route("/users/login", post(handlers::users::login))
        .route(
            "/users/refresh-token",
            post(handlers::users::refresh_access_token),
        );
    if state.config.rate_limit_enabled {
        public_routes = public_routes.layer(create_auth_rate_limiter(&state.config)?);
    }

    let protected_routes = Router::new()
        .route("/users/logout", post(handlers::users::logout))
        .route(
            "/users/change-password",
            post(handlers::users::change_password),
        )
        .route("/users/current-user", get(handlers::users::current_user))
        .route(
            "/users/update-account-details",
            patch(handlers::users::update_account_details),
        )
        .route("/users/update-avatar", patch(handlers::users::update_avatar))
        .route(
            "/users/update-cover-image",
            patch(handlers::users::update_cover_image),
        )
        .route(
            "/users/c/{user_name}",
            get(handlers::users::channel_profile),
        )
        .route("/users/watch-history", get(handlers::users::watch_history))
        .route(
            "/videos",
            get(handlers::videos::list_videos).post(handlers::videos::publish_video),
        )
        .route(
            "/videos/{video_id}",
            get(handlers::videos::get_video)
                .patch(handlers::videos::update_video)
                .delete(handlers::videos::delete_video),
        )
        .route(
            "/videos/{video_id}/toggle-publish",
            patch(handlers::videos::toggle_publish_status),
        )
        .route(
            "/videos/toggle/publish/{video_id}",
            patch(handlers::videos::toggle_publish_status),
        )
        .route(
            "/likes/toggle/v/{video_id}",
            post(handlers::likes::toggle_video_like),
        )
        .route(
            "/likes/toggle/c/{comment_id}",
            post(handlers::likes::toggle_comment_like),
        )
        .route("/likes/videos", get(handlers::likes::liked_videos))
        .route(
            "/comments/{video_id}",
            get(handlers::comments::list_comments).post(handlers::comments::add_comment),
        )
        .route(
            "/comments/c/{comment_id}",
            patch(handlers::comments::update_comment).delete(handlers::comments::delete_comment),
        )
        .route(
            "/subscriptions/c/{channel_id}",
            get(handlers::subscriptions::channel_subscribers)
                .post(handlers::subscriptions::toggle_subscription),
        )
        .route(
            "/subscriptions/u/{subscriber_id}",
            get(handlers::subscriptions::subscribed_channels),
        )
        .route("/chat/ws", get(chat_socket))
        .route("/chat/{video_id}", get(handlers::chat::chat_history))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth,
        ));

    let mut app = Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .route("/healthz", get(handlers::healthz));

    if state.config.cloudinary.is_none() {
        app = app.nest_service("/media", ServeDir::new(&state.config.media_dir));
    }

    let cors = cors_layer(&state.config.cors_allow_origins)?;

    Ok(app
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id))
                .layer(cors)
                .map_response(|res: axum::response::Response<_>| res.map(axum::body::Body::new))
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(middleware::log_error_responses)),
        )
        .with_state(state))
}

/// Cookies travel cross-origin, so origins must be listed explicitly.
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin: {}", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(Duration::from_secs(24 * 60 * 60)))
}
