use axum::{
    Extension, Json,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::auth::token::Claims;
use crate::services::{LoginOutcome, LoginResult, PasswordIssue, TokenPair};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct ChangePasswordResponse {
    pub issue: PasswordIssue,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Requires a fully valid bearer token (signature, issuer, audience, expiry)
/// and records the caller's claims on the request for handlers downstream.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let Some(token) = extract_bearer(&headers) else {
        return Err(ApiError::unauthorized("Missing bearer token"));
    };

    let Some(claims) = state.signer.decode(&token) else {
        return Err(ApiError::unauthorized("Invalid or expired token"));
    };

    tracing::Span::current().record("user_id", claims.name_identifier);
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/users/login
/// Verify credentials, return the token pair on success.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResult>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    match state.auth.login(&payload.username, &payload.password).await? {
        LoginOutcome::Success(result) => Ok(Json(*result)),
        LoginOutcome::NotFound => Err(ApiError::NotFound("Account not found".to_string())),
        LoginOutcome::IncorrectPassword => Err(ApiError::validation("Incorrect password")),
    }
}

/// POST /api/users/refresh-token
/// The bearer token only identifies the caller here, so an expired (but
/// structurally valid) one is accepted; the refresh token does the proving.
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let Some(bearer) = extract_bearer(&headers) else {
        return Err(ApiError::unauthorized("Missing bearer token"));
    };

    let Some(claims) = state.signer.decode_expired(&bearer) else {
        return Err(ApiError::unauthorized("Invalid token"));
    };

    let pair = state
        .auth
        .refresh(claims.name_identifier, &payload.refresh_token)
        .await?;

    pair.map(Json)
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))
}

/// PUT /api/users/{id}/change-password
/// Only the account owner may change their password through this path.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::validation(
            "New password must be at least 8 characters",
        ));
    }

    let issue = state
        .auth
        .change_password(
            id,
            claims.name_identifier,
            &payload.old_password,
            &payload.new_password,
        )
        .await?;

    let status = match issue {
        PasswordIssue::None => StatusCode::OK,
        PasswordIssue::IncorrectOldPassword => StatusCode::BAD_REQUEST,
        PasswordIssue::Unauthorized => StatusCode::UNAUTHORIZED,
        PasswordIssue::NotFound => StatusCode::NOT_FOUND,
    };

    Ok((status, Json(ChangePasswordResponse { issue })))
}

/// POST /api/users/logout
/// Invalidates the stored refresh token; the client discards its copies.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.logout(claims.name_identifier).await?;

    tracing::info!("User logged out: {}", claims.name);

    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}
