//! HTTP-level behaviour of the `/auth` and `/users` routers

use std::sync::{Arc, Mutex};

use auth::application::{ResetDelivery, ResetTicket};
use auth::{AuthAppState, AuthConfig, InMemoryAuthRepository, auth_router, users_router};
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const PASSWORD: &str = "correct horse battery";

#[derive(Clone, Default)]
struct CapturedTickets(Arc<Mutex<Vec<String>>>);

impl CapturedTickets {
    fn last(&self) -> Option<String> {
        self.0.lock().unwrap().last().cloned()
    }
}

impl ResetDelivery for CapturedTickets {
    fn deliver(&self, ticket: &ResetTicket) {
        self.0.lock().unwrap().push(ticket.token.clone());
    }
}

fn app_with(tickets: CapturedTickets) -> Router {
    let state = AuthAppState::new(InMemoryAuthRepository::new(), AuthConfig::for_tests())
        .unwrap()
        .with_reset_delivery(tickets);

    Router::new()
        .nest("/auth", auth_router(state.clone()))
        .nest("/users", users_router(state))
}

fn app() -> Router {
    app_with(CapturedTickets::default())
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

async fn post(app: &Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, token, Some(body)).await
}

async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::GET, uri, token, None).await
}

async fn register_admin(app: &Router) -> Value {
    let (status, body) = post(
        app,
        "/auth/register",
        None,
        json!({ "email": "a@x.com", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn register_user(app: &Router, admin_token: &str, email: &str) -> Value {
    let (status, body) = post(
        app,
        "/auth/register",
        Some(admin_token),
        json!({ "email": email, "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

fn access(body: &Value) -> String {
    body["accessToken"].as_str().unwrap().to_string()
}

fn refresh(body: &Value) -> String {
    body["refreshToken"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_bootstrap_login_refresh_scenario() {
    let app = app();

    let admin = register_admin(&app).await;
    assert_eq!(admin["user"]["role"], "ADMIN");
    assert_eq!(admin["user"]["isActive"], true);
    assert_eq!(admin["expiresIn"], 900);

    let (status, body) = post(
        &app,
        "/auth/register",
        None,
        json!({ "email": "b@x.com", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["statusCode"], 403);

    let (status, login) = post(
        &app,
        "/auth/login",
        None,
        json!({ "email": "a@x.com", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &app,
        "/auth/login",
        None,
        json!({ "email": "a@x.com", "password": "not the password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = post(
        &app,
        "/auth/login",
        None,
        json!({ "email": "ghost@x.com", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let old_refresh = refresh(&login);
    let (status, rotated) = post(
        &app,
        "/auth/refresh",
        None,
        json!({ "refreshToken": old_refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rotated["user"]["email"], "a@x.com");
    assert_ne!(refresh(&rotated), old_refresh);

    let (status, _) = post(
        &app,
        "/auth/refresh",
        None,
        json!({ "refreshToken": old_refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_registers_users_with_roles() {
    let app = app();
    let admin = access(&register_admin(&app).await);

    let user = register_user(&app, &admin, "b@x.com").await;
    assert_eq!(user["user"]["role"], "USER");

    let (status, viewer) = post(
        &app,
        "/auth/register",
        Some(&admin),
        json!({ "email": "c@x.com", "password": PASSWORD, "role": "VIEWER" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(viewer["user"]["role"], "VIEWER");

    let (status, _) = post(
        &app,
        "/auth/register",
        Some(&access(&user)),
        json!({ "email": "d@x.com", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post(
        &app,
        "/auth/register",
        Some(&admin),
        json!({ "email": "b@x.com", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(
        &app,
        "/auth/register",
        Some(&admin),
        json!({ "email": "e@x.com", "password": "short" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_requires_access_token() {
    let app = app();
    let admin = register_admin(&app).await;

    let (status, me) = get(&app, "/auth/me", Some(&access(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "a@x.com");
    assert_eq!(me["role"], "ADMIN");
    assert!(me.get("passwordHash").is_none());

    let (status, _) = get(&app, "/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&app, "/auth/me", Some(&refresh(&admin))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&app, "/auth/me", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_users_routes_are_admin_only() {
    let app = app();
    let admin = access(&register_admin(&app).await);
    let user = register_user(&app, &admin, "b@x.com").await;
    let user_id = user["user"]["id"].as_str().unwrap().to_string();

    let (status, _) = get(&app, "/users", Some(&access(&user))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = get(&app, "/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, list) = get(&app, "/users", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);

    let (status, one) = get(&app, &format!("/users/{}", user_id), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["email"], "b@x.com");

    let (status, _) = get(&app, "/users/not-a-uuid", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = "00000000-0000-4000-8000-000000000000";
    let (status, _) = get(&app, &format!("/users/{}", unknown), Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deactivated_user_loses_access() {
    let app = app();
    let admin = access(&register_admin(&app).await);
    let user = register_user(&app, &admin, "b@x.com").await;
    let user_id = user["user"]["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        Method::PATCH,
        &format!("/users/{}", user_id),
        Some(&admin),
        Some(json!({ "isActive": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["isActive"], false);

    let (status, _) = get(&app, "/auth/me", Some(&access(&user))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post(
        &app,
        "/auth/refresh",
        None,
        json!({ "refreshToken": refresh(&user) }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post(
        &app,
        "/auth/login",
        None,
        json!({ "email": "b@x.com", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_temporary_password_then_change() {
    let app = app();
    let admin = access(&register_admin(&app).await);
    let user = register_user(&app, &admin, "b@x.com").await;
    let user_id = user["user"]["id"].as_str().unwrap().to_string();

    let (status, issued) = post(
        &app,
        &format!("/users/{}/temporary-password", user_id),
        Some(&admin),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(issued["user"]["mustChangePassword"], true);
    let temporary = issued["temporaryPassword"].as_str().unwrap().to_string();

    let (status, login) = post(
        &app,
        "/auth/login",
        None,
        json!({ "email": "b@x.com", "password": temporary }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["mustChangePassword"], true);

    let (status, changed) = post(
        &app,
        "/auth/change-password",
        Some(&access(&login)),
        json!({ "currentPassword": temporary, "newPassword": "my own password" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(changed["mustChangePassword"], false);

    let (status, _) = post(
        &app,
        "/auth/change-password",
        Some(&access(&login)),
        json!({ "currentPassword": "wrong password", "newPassword": "another password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let tickets = CapturedTickets::default();
    let app = app_with(tickets.clone());
    let admin = register_admin(&app).await;

    let (status, body) = post(
        &app,
        "/auth/forgot-password",
        None,
        json!({ "email": "ghost@x.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
    assert!(tickets.last().is_none());

    let (status, body) = post(
        &app,
        "/auth/forgot-password",
        None,
        json!({ "email": "a@x.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
    let token = tickets.last().unwrap();

    let (status, _) = post(
        &app,
        "/auth/reset-password",
        None,
        json!({ "token": token, "newPassword": "brand new password" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &app,
        "/auth/reset-password",
        None,
        json!({ "token": token, "newPassword": "another new password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post(
        &app,
        "/auth/refresh",
        None,
        json!({ "refreshToken": refresh(&admin) }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post(
        &app,
        "/auth/login",
        None,
        json!({ "email": "a@x.com", "password": "brand new password" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_always_succeeds() {
    let app = app();
    let admin = register_admin(&app).await;

    let (status, body) = post(
        &app,
        "/auth/logout",
        None,
        json!({ "refreshToken": "garbage" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, _) = send(&app, Method::POST, "/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &app,
        "/auth/logout",
        None,
        json!({ "refreshToken": refresh(&admin) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &app,
        "/auth/refresh",
        None,
        json!({ "refreshToken": refresh(&admin) }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = post(&app, "/auth/login", None, json!({ "email": "a@x.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
