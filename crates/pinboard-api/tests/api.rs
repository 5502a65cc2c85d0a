use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::Path,
    http::{Request, StatusCode, header},
    response::Response,
    routing::get,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use pinboard_api::{AppState, AppStateInner, router};
use pinboard_db::{Database, MessageStore};

fn test_state(cat_api_url: &str) -> AppState {
    Arc::new(AppStateInner {
        messages: MessageStore::new(),
        db: Database::open_in_memory().unwrap(),
        http: reqwest::Client::new(),
        public_url: "http://localhost:8080".into(),
        cat_api_url: cat_api_url.into(),
    })
}

fn app() -> (Router, AppState) {
    let state = test_state("http://127.0.0.1:9");
    (router(state.clone()), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// -- Message board --

#[tokio::test]
async fn message_crud_flow() {
    let (app, state) = app();

    let response = send(
        &app,
        "POST",
        "/api/messages",
        Some(json!({ "username": "ada", "content": "hello" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], 1);
    assert_eq!(body["data"]["username"], "ada");

    let response = send(
        &app,
        "PUT",
        "/api/messages/1",
        Some(json!({ "content": "edited" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["content"], "edited");

    let response = send(&app, "GET", "/api/messages", None).await;
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = send(&app, "DELETE", "/api/messages/1", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(state.messages.count(), 0);

    let response = send(&app, "DELETE", "/api/messages/1", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "message 1 not found");
}

#[tokio::test]
async fn message_input_errors_are_bad_requests() {
    let (app, _) = app();

    let response = send(
        &app,
        "POST",
        "/api/messages",
        Some(json!({ "username": "", "content": "hello" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "username cannot be empty");

    let request = Request::builder()
        .method("POST")
        .uri("/api/messages")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid request body");

    let response = send(
        &app,
        "PUT",
        "/api/messages/abc",
        Some(json!({ "content": "x" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "PUT",
        "/api/messages/77",
        Some(json!({ "content": "x" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_message_count() {
    let (app, state) = app();
    state.messages.create("ada", "one").unwrap();
    state.messages.create("bob", "two").unwrap();

    let response = send(&app, "GET", "/api/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["total_messages"], 2);
    assert!(body["timestamp"].is_string());
}

// -- Status codes --

#[tokio::test]
async fn status_endpoint_describes_known_codes() {
    let (app, _) = app();

    let response = send(&app, "GET", "/api/status/404", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status_code"], 404);
    assert_eq!(body["data"]["description"], "Not Found");
    assert_eq!(body["data"]["image_url"], "http://localhost:8080/api/cat/404");

    let response = send(&app, "GET", "/api/status/418", None).await;
    assert_eq!(json_body(response).await["data"]["description"], "Unknown Status");
}

#[tokio::test]
async fn status_endpoint_rejects_out_of_range_codes() {
    let (app, _) = app();
    for code in ["999", "999999", "42", "abc"] {
        let response = send(&app, "GET", &format!("/api/status/{}", code), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "code {}", code);
    }
}

#[tokio::test]
async fn cat_images_are_proxied_with_cache_header() {
    let upstream = Router::new().route(
        "/{code}",
        get(|Path(code): Path<u16>| async move {
            (
                [(header::CONTENT_TYPE, "image/jpeg")],
                format!("cat-{}", code).into_bytes(),
            )
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let app = router(test_state(&format!("http://{}", addr)));

    let response = send(&app, "GET", "/api/cat/200", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=86400"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"cat-200");

    let response = send(&app, "GET", "/api/cat/700", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// -- Blog --

#[tokio::test]
async fn user_lifecycle_over_http() {
    let (app, state) = app();

    let response = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({ "name": "Ada", "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = json_body(response).await["data"]["id"].as_i64().unwrap();

    let response = send(&app, "PUT", &format!("/api/users/{}", id), Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "no fields to update");

    let response = send(
        &app,
        "PUT",
        &format!("/api/users/{}", id),
        Some(json!({ "name": "Ada L." })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["name"], "Ada L.");
    assert_eq!(body["data"]["email"], "ada@example.com");

    let response = send(&app, "DELETE", &format!("/api/users/{}", id), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "GET", &format!("/api/users/{}", id), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(state.db.user_deleted_at(id).unwrap().unwrap().is_some());
}

#[tokio::test]
async fn blog_validation_and_conflicts() {
    let (app, _) = app();

    let response = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({ "name": "A", "email": "a@example.com" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "name must be at least 2 characters"
    );

    let user = json!({ "name": "Ada", "email": "ada@example.com" });
    let response = send(&app, "POST", "/api/users", Some(user.clone())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = send(&app, "POST", "/api/users", Some(user)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        "POST",
        "/api/categories",
        Some(json!({ "name": "Rust", "color": "#ZZZZZZ" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid color format");
}

#[tokio::test]
async fn posts_and_categories_over_http() {
    let (app, _) = app();

    let response = send(
        &app,
        "POST",
        "/api/users",
        Some(json!({ "name": "Ada", "email": "ada@example.com" })),
    )
    .await;
    let user_id = json_body(response).await["data"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        "POST",
        "/api/posts",
        Some(json!({ "user_id": user_id, "title": "First post", "content": "Hi", "published": true })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let post_id = json_body(response).await["data"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        "POST",
        "/api/categories",
        Some(json!({ "name": "Rust", "color": "#1a2b3c" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let category_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["active"], true);

    let response = send(
        &app,
        "PUT",
        &format!("/api/posts/{}/categories/{}", post_id, category_id),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        "GET",
        &format!("/api/categories/{}/posts", category_id),
        None,
    )
    .await;
    let body = json_body(response).await;
    assert_eq!(body["data"][0]["id"], post_id);

    let response = send(&app, "GET", &format!("/api/users/{}/posts", user_id), None).await;
    assert_eq!(json_body(response).await["data"].as_array().unwrap().len(), 1);

    let response = send(
        &app,
        "PUT",
        &format!("/api/categories/{}", category_id),
        Some(json!({ "active": false })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/api/categories?active=true", None).await;
    assert!(json_body(response).await["data"].as_array().unwrap().is_empty());

    let response = send(&app, "DELETE", &format!("/api/posts/{}", post_id), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = send(&app, "GET", "/api/posts", None).await;
    assert!(json_body(response).await["data"].as_array().unwrap().is_empty());
}
