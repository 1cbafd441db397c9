use axum::http::StatusCode;
use tower::ServiceExt;
use vidtube_backend::{repositories::chat as chat_repo, types::VideoId};

mod support;

#[tokio::test]
async fn history_is_returned_oldest_first() {
    let pool = support::test_pool().await;
    let owner = support::seed_user(&pool, "owner").await;
    let fan = support::seed_user(&pool, "fan").await;
    let video = support::seed_video(&pool, &owner, "live").await;
    for text in ["one", "two", "three"] {
        chat_repo::insert_message(&pool, video.id, fan.id, text)
            .await
            .unwrap();
    }
    let state = support::test_state(pool, support::MockMediaStore::new());
    let token = support::login_token(&state, &owner).await;
    let app = support::test_app(state);

    let response = app
        .oneshot(support::empty_request(
            "GET",
            &format!("/api/v1/chat/{}", video.id),
            Some(&token),
        ))
        .await
        .expect("history request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = support::read_json(response).await;
    let texts: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["one", "two", "three"]);
    assert_eq!(body["data"][0]["userId"], fan.id.to_string());
    assert_eq!(body["data"][0]["videoId"], video.id.to_string());
}

#[tokio::test]
async fn history_for_unknown_video_is_not_found() {
    let pool = support::test_pool().await;
    let user = support::seed_user(&pool, "user").await;
    let state = support::test_state(pool, support::MockMediaStore::new());
    let token = support::login_token(&state, &user).await;
    let app = support::test_app(state);

    let response = app
        .oneshot(support::empty_request(
            "GET",
            &format!("/api/v1/chat/{}", VideoId::new()),
            Some(&token),
        ))
        .await
        .expect("history request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_endpoints_require_authentication() {
    let pool = support::test_pool().await;
    let app = support::test_app(support::test_state(pool, support::MockMediaStore::new()));

    for uri in [
        "/api/v1/chat/ws".to_string(),
        format!("/api/v1/chat/{}", VideoId::new()),
    ] {
        let response = app
            .clone()
            .oneshot(support::empty_request("GET", &uri, None))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn healthz_is_public() {
    let pool = support::test_pool().await;
    let app = support::test_app(support::test_state(pool, support::MockMediaStore::new()));

    let response = app
        .oneshot(support::empty_request("GET", "/healthz", None))
        .await
        .expect("healthz request");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(support::read_json(response).await["status"], "ok");
}
