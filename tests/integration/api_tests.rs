//! HTTP surface, driven through the router without a socket

use axum::{
    body::Body,
    http::{header::WWW_AUTHENTICATE, Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use crate::common::{add_book, send, spawn_app, TestApp, ADMIN_PASSWORD, MEMBER_PASSWORD};

async fn token_for(app: &TestApp, email: &str, password: &str) -> String {
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

async fn admin_token(app: &TestApp) -> String {
    token_for(app, "ada@example.org", ADMIN_PASSWORD).await
}

async fn member_token(app: &TestApp) -> String {
    token_for(app, "mel@example.org", MEMBER_PASSWORD).await
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = spawn_app().await;

    let (status, body) = send(&app.router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app.router, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_missing_bearer_is_unauthorized_with_challenge() {
    let app = spawn_app().await;

    let request = Request::builder().uri("/me").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get(WWW_AUTHENTICATE).unwrap(), "Bearer");
}

#[tokio::test]
async fn test_garbage_bearer_is_unauthorized() {
    let app = spawn_app().await;

    let (status, body) = send(&app.router, Method::GET, "/me", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
async fn test_login_me_logout_flow() {
    let app = spawn_app().await;
    let token = member_token(&app).await;

    let (status, body) = send(&app.router, Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "mel");
    assert_eq!(body["role"], "user");
    assert!(body.get("password_hash").is_none());

    let (status, body) = send(&app.router, Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out");

    let (status, _) = send(&app.router, Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/login",
        None,
        Some(json!({ "email": "mel@example.org", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "InvalidCredentials");
}

#[tokio::test]
async fn test_login_with_malformed_email_is_invalid_credentials() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/login",
        None,
        Some(json!({ "email": "not-an-email", "password": MEMBER_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "InvalidCredentials");
}

#[tokio::test]
async fn test_register_validates_and_rejects_duplicates() {
    let app = spawn_app().await;
    let payload = json!({
        "name": "Nia",
        "username": "nia",
        "email": "nia@example.org",
        "password": "nia-pass"
    });

    let (status, body) =
        send(&app.router, Method::POST, "/users/register", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "user");

    let (status, _) = send(&app.router, Method::POST, "/users/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/users/register",
        None,
        Some(json!({
            "name": "Bad",
            "username": "bad",
            "email": "not-an-email",
            "password": "bad-pass"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_member_cannot_reach_admin_routes() {
    let app = spawn_app().await;
    let token = member_token(&app).await;

    let (status, _) = send(&app.router, Method::GET, "/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/books",
        Some(&token),
        Some(json!({
            "name": "Dune",
            "author": "Frank Herbert",
            "isbn": "9780441013593",
            "stock": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_loans_are_owner_or_admin_only() {
    let app = spawn_app().await;
    let member = member_token(&app).await;
    let admin = admin_token(&app).await;

    let other = format!("/users/{}/loans", app.admin.id);
    let (status, _) = send(&app.router, Method::GET, &other, Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let own = format!("/users/{}/loans", app.member.id);
    let (status, body) = send(&app.router, Method::GET, &own, Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = send(&app.router, Method::GET, &own, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_borrow_and_return_over_http() {
    let app = spawn_app().await;
    let member = member_token(&app).await;
    let admin = admin_token(&app).await;
    let book = add_book(&app.services, "9780441013593", 1).await;

    let for_other = json!({
        "user_id": app.admin.id,
        "book_id": book.id,
        "date_borrowed": "2024-03-01",
        "date_due": "2024-03-15"
    });
    let (status, _) = send(&app.router, Method::POST, "/loans", Some(&member), Some(for_other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let for_self = json!({
        "user_id": app.member.id,
        "book_id": book.id,
        "date_borrowed": "2024-03-01",
        "date_due": "2024-03-15"
    });
    let (status, loan) =
        send(&app.router, Method::POST, "/loans", Some(&member), Some(for_self.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["user"], "Mel Member");
    assert_eq!(loan["book"], "Book 9780441013593");

    let (status, body) = send(&app.router, Method::POST, "/loans", Some(&member), Some(for_self)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "OutOfStock");

    let return_uri = format!("/loans/{}/return", loan["id"]);
    let (status, _) = send(&app.router, Method::POST, &return_uri, Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app.router, Method::POST, &return_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        send(&app.router, Method::GET, &format!("/books/{}", book.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock"], 1);
}

#[tokio::test]
async fn test_book_loans_not_found_when_empty() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let book = add_book(&app.services, "9780441013594", 1).await;

    let uri = format!("/books/{}/loans", book.id);
    let (status, _) = send(&app.router, Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;

    let own = format!("/users/{}", app.admin.id);
    let (status, _) = send(&app.router, Method::DELETE, &own, Some(&admin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let member = format!("/users/{}", app.member.id);
    let (status, body) = send(&app.router, Method::DELETE, &member, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, serde_json::Value::Null);
}

#[tokio::test]
async fn test_password_change_is_self_only() {
    let app = spawn_app().await;
    let admin = admin_token(&app).await;
    let member = member_token(&app).await;
    let uri = format!("/users/{}/password", app.member.id);

    let (status, _) = send(
        &app.router,
        Method::PUT,
        &uri,
        Some(&admin),
        Some(json!({ "password": MEMBER_PASSWORD, "new_password": "fresh-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app.router,
        Method::PUT,
        &uri,
        Some(&member),
        Some(json!({ "password": "wrong", "new_password": "fresh-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        Method::PUT,
        &uri,
        Some(&member),
        Some(json!({ "password": MEMBER_PASSWORD, "new_password": "fresh-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    token_for(&app, "mel@example.org", "fresh-pass").await;
}
