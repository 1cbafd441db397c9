use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;
use vidtube_backend::{repositories::comment as comment_repo, types::CommentId};

mod support;

#[tokio::test]
async fn video_like_toggles_between_created_and_removed() {
    let pool = support::test_pool().await;
    let owner = support::seed_user(&pool, "owner").await;
    let fan = support::seed_user(&pool, "fan").await;
    let video = support::seed_video(&pool, &owner, "intro").await;
    let state = support::test_state(pool, support::MockMediaStore::new());
    let token = support::login_token(&state, &fan).await;
    let app = support::test_app(state);
    let path = format!("/api/v1/likes/toggle/v/{}", video.id);

    let response = app
        .clone()
        .oneshot(support::empty_request("POST", &path, Some(&token)))
        .await
        .expect("like request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = support::read_json(response).await;
    assert_eq!(body["data"]["liked"], true);
    assert_eq!(body["data"]["targetType"], "video");

    let response = app
        .clone()
        .oneshot(support::empty_request("GET", "/api/v1/likes/videos", Some(&token)))
        .await
        .expect("liked videos request");
    let body = support::read_json(response).await;
    assert_eq!(body["data"][0]["id"], video.id.to_string());

    let response = app
        .clone()
        .oneshot(support::empty_request("POST", &path, Some(&token)))
        .await
        .expect("unlike request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(support::read_json(response).await["data"]["liked"], false);

    let response = app
        .oneshot(support::empty_request("GET", "/api/v1/likes/videos", Some(&token)))
        .await
        .expect("liked videos request");
    let body = support::read_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn liking_missing_targets_is_not_found() {
    let pool = support::test_pool().await;
    let fan = support::seed_user(&pool, "fan").await;
    let state = support::test_state(pool, support::MockMediaStore::new());
    let token = support::login_token(&state, &fan).await;
    let app = support::test_app(state);

    let response = app
        .clone()
        .oneshot(support::empty_request(
            "POST",
            &format!("/api/v1/likes/toggle/c/{}", CommentId::new()),
            Some(&token),
        ))
        .await
        .expect("like request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(support::empty_request(
            "POST",
            "/api/v1/likes/toggle/v/bogus",
            Some(&token),
        ))
        .await
        .expect("like request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn comments_are_listed_oldest_first_with_like_counts() {
    let pool = support::test_pool().await;
    let owner = support::seed_user(&pool, "owner").await;
    let fan = support::seed_user(&pool, "fan").await;
    let video = support::seed_video(&pool, &owner, "intro").await;
    let state = support::test_state(pool, support::MockMediaStore::new());
    let fan_token = support::login_token(&state, &fan).await;
    let owner_token = support::login_token(&state, &owner).await;
    let app = support::test_app(state);
    let path = format!("/api/v1/comments/{}", video.id);

    let mut ids = Vec::new();
    for content in ["first!", "second"] {
        let response = app
            .clone()
            .oneshot(support::json_request(
                "POST",
                &path,
                Some(&fan_token),
                &json!({ "content": content }),
            ))
            .await
            .expect("comment request");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = support::read_json(response).await;
        ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let response = app
        .clone()
        .oneshot(support::empty_request(
            "POST",
            &format!("/api/v1/likes/toggle/c/{}", ids[0]),
            Some(&owner_token),
        ))
        .await
        .expect("like request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(support::empty_request(
            "GET",
            &format!("{}?page=1&limit=10", path),
            Some(&fan_token),
        ))
        .await
        .expect("list request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = support::read_json(response).await;
    assert_eq!(body["data"]["totalDocs"], 2);
    assert_eq!(body["data"]["docs"][0]["content"], "first!");
    assert_eq!(body["data"]["docs"][0]["likesCount"], 1);
    assert_eq!(body["data"]["docs"][0]["ownerDetails"]["userName"], "fan");
    assert_eq!(body["data"]["docs"][1]["content"], "second");
    assert_eq!(body["data"]["docs"][1]["likesCount"], 0);

    let response = app
        .oneshot(support::json_request(
            "POST",
            &path,
            Some(&fan_token),
            &json!({ "content": "   " }),
        ))
        .await
        .expect("blank comment request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_the_author_can_edit_or_delete_a_comment() {
    let pool = support::test_pool().await;
    let owner = support::seed_user(&pool, "owner").await;
    let fan = support::seed_user(&pool, "fan").await;
    let video = support::seed_video(&pool, &owner, "intro").await;
    let comment = comment_repo::insert_comment(&pool, video.id, fan.id, "original")
        .await
        .unwrap();
    let state = support::test_state(pool.clone(), support::MockMediaStore::new());
    let fan_token = support::login_token(&state, &fan).await;
    let owner_token = support::login_token(&state, &owner).await;
    let app = support::test_app(state);
    let path = format!("/api/v1/comments/c/{}", comment.id);

    // Owning the video does not grant control over other people's comments.
    let response = app
        .clone()
        .oneshot(support::json_request(
            "PATCH",
            &path,
            Some(&owner_token),
            &json!({ "content": "edited by owner" }),
        ))
        .await
        .expect("edit request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(support::empty_request("DELETE", &path, Some(&owner_token)))
        .await
        .expect("delete request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(support::json_request(
            "PATCH",
            &path,
            Some(&fan_token),
            &json!({ "content": "edited" }),
        ))
        .await
        .expect("edit request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(support::read_json(response).await["data"]["content"], "edited");

    let response = app
        .clone()
        .oneshot(support::empty_request("DELETE", &path, Some(&fan_token)))
        .await
        .expect("delete request");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(comment_repo::find_by_id(&pool, comment.id).await.unwrap().is_none());

    let response = app
        .oneshot(support::empty_request("DELETE", &path, Some(&fan_token)))
        .await
        .expect("delete request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
