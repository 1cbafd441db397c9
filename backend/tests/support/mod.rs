#![allow(dead_code)]
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, Response},
    Router,
};
use mockall::mock;
use serde_json::Value;
use vidtube_backend::{
    config::Config,
    db::connection::{create_pool, run_migrations, DbPool},
    models::{
        user::{NewUser, User},
        video::{NewVideo, Video},
    },
    repositories::{user as user_repo, video as video_repo},
    routes::build_router,
    services::media::{MediaKind, MediaStore, StoredMedia},
    state::AppState,
    utils::{cookies::SameSite, password::hash_password, upload::StagedFile},
};

pub const PASSWORD: &str = "Password123!";
pub const BOUNDARY: &str = "vidtube-test-boundary";

mock! {
    pub MediaStore {}

    #[async_trait]
    impl MediaStore for MediaStore {
        async fn upload(&self, file: &StagedFile, kind: MediaKind) -> anyhow::Result<StoredMedia>;
        async fn destroy(&self, public_id: &str, kind: MediaKind) -> anyhow::Result<()>;
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        port: 0,
        cors_allow_origins: vec!["http://localhost:5173".into()],
        access_token_secret: "test-access-secret".into(),
        access_token_expiry_minutes: 15,
        refresh_token_secret: "test-refresh-secret".into(),
        refresh_token_expiry_days: 10,
        cookie_secure: false,
        cookie_same_site: SameSite::Lax,
        upload_tmp_dir: std::env::temp_dir().join("vidtube-test-uploads"),
        media_dir: std::env::temp_dir().join("vidtube-test-media"),
        media_public_url: "http://localhost/media".into(),
        cloudinary: None,
        rate_limit_enabled: false,
        rate_limit_auth_max_requests: 20,
        rate_limit_auth_window_seconds: 60,
    }
}

pub async fn test_pool() -> DbPool {
    let pool = create_pool("sqlite::memory:")
        .await
        .expect("create in-memory pool");
    run_migrations(&pool).await.expect("run migrations");
    pool
}

/// Media store that accepts every upload and delete.
pub fn accepting_media() -> MockMediaStore {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut media = MockMediaStore::new();
    media.expect_upload().returning(move |_, kind| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let public_id = format!("{:?}-{}", kind, n).to_lowercase();
        Ok(StoredMedia {
            url: format!("http://media.test/{}", public_id),
            public_id,
            duration: (kind == MediaKind::Video).then_some(42.5),
        })
    });
    media.expect_destroy().returning(|_, _| Ok(()));
    media
}

pub fn test_state(pool: DbPool, media: MockMediaStore) -> AppState {
    let media: Arc<dyn MediaStore> = Arc::new(media);
    AppState::new(pool, test_config(), media)
}

pub fn test_app(state: AppState) -> Router {
    build_router(state).expect("build router")
}

pub async fn seed_user(pool: &DbPool, user_name: &str) -> User {
    let new_user = NewUser {
        user_name: user_name.to_string(),
        email: format!("{}@example.com", user_name),
        full_name: format!("{} Tester", user_name),
        password_hash: hash_password(PASSWORD).expect("hash password"),
        avatar_url: format!("http://media.test/{}-avatar", user_name),
        avatar_public_id: format!("{}-avatar", user_name),
        cover_image_url: None,
        cover_image_public_id: None,
    };
    user_repo::insert_user(pool, &new_user)
        .await
        .expect("insert user")
}

pub async fn seed_video(pool: &DbPool, owner: &User, title: &str) -> Video {
    let new_video = NewVideo {
        owner_id: owner.id,
        title: title.to_string(),
        description: format!("{} description", title),
        video_url: format!("http://media.test/{}.mp4", title),
        video_public_id: format!("{}-video", title),
        thumbnail_url: format!("http://media.test/{}.png", title),
        thumbnail_public_id: format!("{}-thumb", title),
        duration: 10.0,
    };
    video_repo::insert_video(pool, &new_video)
        .await
        .expect("insert video")
}

/// Access token for `user`, issued through the token service.
pub async fn login_token(state: &AppState, user: &User) -> String {
    state
        .tokens
        .issue_token_pair(&state.pool, user)
        .await
        .expect("issue token pair")
        .access_token
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("build json request")
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("build request")
}

/// A multipart part: text field `(name, value, None)` or file `(name, file_name, Some(bytes))`.
pub type Part<'a> = (&'a str, &'a str, Option<&'a [u8]>);

pub fn multipart_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    parts: &[Part<'_>],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value, file) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file {
            Some(bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, value
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).expect("build multipart request")
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json body")
}

/// Value of a `Set-Cookie` header for `name`; cleared cookies come back as `Some("")`.
pub fn set_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .find_map(|value| {
            let value = value.to_str().ok()?;
            let token = value.strip_prefix(&prefix)?.split(';').next()?.trim();
            Some(token.to_string())
        })
}
