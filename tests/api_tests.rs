use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use cinecrit_auth::api::AppState;
use cinecrit_auth::config::Config;
use cinecrit_auth::db::UserPatch;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

/// Bootstrap credentials seeded by the initial migration
const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "password";

fn test_config() -> Config {
    let db_path =
        std::env::temp_dir().join(format!("cinecrit-api-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.auth.issuer = "cinecrit".to_string();
    config.auth.audience = "cinecrit-web".to_string();
    config.auth.token_secret =
        "integration-test-secret-0123456789abcdef0123456789abcdef".to_string();
    config
}

async fn spawn_app() -> (Arc<AppState>, Router) {
    let state = cinecrit_auth::api::create_app_state_from_config(test_config())
        .await
        .expect("failed to create app state");
    let router = cinecrit_auth::api::router(state.clone()).await;
    (state, router)
}

async fn post_json(
    app: &Router,
    uri: &str,
    bearer: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send_json(app, "POST", uri, bearer, body).await
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    if let Some(token) = bearer {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
    post_json(
        app,
        "/api/users/login",
        None,
        serde_json::json!({ "username": username, "password": password }),
    )
    .await
}

#[tokio::test]
async fn login_unknown_user_returns_404() {
    let (_, app) = spawn_app().await;

    let (status, _) = login(&app, "ghost", "x").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_wrong_password_returns_400() {
    let (_, app) = spawn_app().await;

    let (status, _) = login(&app, ADMIN_USERNAME, "wrong-password").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_success_returns_token_pair_with_expected_claims() {
    let (state, app) = spawn_app().await;

    let (status, body) = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["username"], ADMIN_USERNAME);
    assert_eq!(body["isLoggedIn"], true);

    let access = body["tokenResponse"]["accessToken"].as_str().unwrap();
    let refresh = body["tokenResponse"]["refreshToken"].as_str().unwrap();
    assert!(!access.is_empty());
    assert_eq!(refresh.len(), 64);

    let claims = state.signer.decode(access).expect("access token verifies");
    assert_eq!(claims.name, ADMIN_USERNAME);
    assert_eq!(claims.name_identifier, 1);
    assert_eq!(claims.role, cinecrit_auth::auth::Role::Admin);
}

#[tokio::test]
async fn refresh_rotates_token_and_rejects_the_old_one() {
    let (_, app) = spawn_app().await;

    let (_, body) = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let access = body["tokenResponse"]["accessToken"].as_str().unwrap();
    let old_refresh = body["tokenResponse"]["refreshToken"].as_str().unwrap();

    let (status, refreshed) = post_json(
        &app,
        "/api/users/refresh-token",
        Some(access),
        serde_json::json!({ "refreshToken": old_refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let new_refresh = refreshed["refreshToken"].as_str().unwrap();
    assert!(!refreshed["accessToken"].as_str().unwrap().is_empty());
    assert_ne!(new_refresh, old_refresh);

    // Rotation invalidated the predecessor.
    let (status, _) = post_json(
        &app,
        "/api/users/refresh-token",
        Some(access),
        serde_json::json!({ "refreshToken": old_refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_with_expired_stored_token_returns_401() {
    let (state, app) = spawn_app().await;

    // A token that was issued with a 7-day lifetime, 8 days ago.
    let token = "a".repeat(64);
    let expired_at = chrono::Utc::now() - chrono::Duration::days(1);
    state
        .store()
        .update_user(1, UserPatch::refresh_token(token.clone(), expired_at))
        .await
        .unwrap();

    let admin = state
        .store()
        .get_user_by_username(ADMIN_USERNAME)
        .await
        .unwrap()
        .unwrap();
    let access = state.signer.issue(&admin).unwrap();

    let (status, _) = post_json(
        &app,
        "/api/users/refresh-token",
        Some(&access),
        serde_json::json!({ "refreshToken": token }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_without_bearer_returns_401() {
    let (_, app) = spawn_app().await;

    let (status, _) = post_json(
        &app,
        "/api/users/refresh-token",
        None,
        serde_json::json!({ "refreshToken": "whatever" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_flow() {
    let (_, app) = spawn_app().await;

    let (_, body) = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let access = body["tokenResponse"]["accessToken"].as_str().unwrap();

    // Wrong old password
    let (status, body) = send_json(
        &app,
        "PUT",
        "/api/users/1/change-password",
        Some(access),
        serde_json::json!({ "oldPassword": "nope", "newPassword": "fresh-password-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["issue"], "IncorrectOldPassword");

    // Someone else's account
    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/users/999/change-password",
        Some(access),
        serde_json::json!({ "oldPassword": ADMIN_PASSWORD, "newPassword": "fresh-password-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correct old password
    let (status, body) = send_json(
        &app,
        "PUT",
        "/api/users/1/change-password",
        Some(access),
        serde_json::json!({ "oldPassword": ADMIN_PASSWORD, "newPassword": "fresh-password-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issue"], "None");

    // Old password no longer works, new one does.
    let (status, _) = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = login(&app, ADMIN_USERNAME, "fresh-password-1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn change_password_requires_bearer() {
    let (_, app) = spawn_app().await;

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/users/1/change-password",
        None,
        serde_json::json!({ "oldPassword": ADMIN_PASSWORD, "newPassword": "fresh-password-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_invalidates_stored_refresh_token() {
    let (_, app) = spawn_app().await;

    let (_, body) = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let access = body["tokenResponse"]["accessToken"].as_str().unwrap();
    let refresh = body["tokenResponse"]["refreshToken"].as_str().unwrap();

    let (status, _) = post_json(&app, "/api/users/logout", Some(access), serde_json::json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_json(
        &app,
        "/api/users/refresh-token",
        Some(access),
        serde_json::json!({ "refreshToken": refresh }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
