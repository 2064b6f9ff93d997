//! Domain service for authentication.
//!
//! Handles login, token refresh, logout, and password changes. Expected
//! outcomes (unknown user, wrong password, stale refresh token) are typed
//! results, never errors; `AuthError` is reserved for lower-layer failures.

use serde::Serialize;
use thiserror::Error;

use crate::auth::policy::Role;
use crate::db::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Access + refresh token pair minted on login and refresh. Transient, never
/// persisted as a pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub username: String,
    pub is_logged_in: bool,
    pub token_response: TokenPair,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Success(Box<LoginResult>),
    /// No user with that username.
    NotFound,
    /// User exists, password does not verify.
    IncorrectPassword,
}

/// Outcome of a change-password request, reported back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PasswordIssue {
    None,
    /// Caller's identity does not match the target account.
    Unauthorized,
    NotFound,
    IncorrectOldPassword,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials; on success mints a token pair and persists the
    /// rotated refresh token.
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError>;

    /// Validates and rotates the presented refresh token, minting a new pair.
    /// Returns `None` when the token is unknown, expired, or already rotated
    /// away; nothing is mutated in that case.
    async fn refresh(
        &self,
        user_id: i32,
        refresh_token: &str,
    ) -> Result<Option<TokenPair>, AuthError>;

    /// Changes a user's password. Only the account owner may do this.
    async fn change_password(
        &self,
        target_user_id: i32,
        requesting_user_id: i32,
        old_password: &str,
        new_password: &str,
    ) -> Result<PasswordIssue, AuthError>;

    /// Clears the stored refresh token so it can no longer be redeemed.
    async fn logout(&self, user_id: i32) -> Result<(), AuthError>;

    /// Registers a user with empty auth fields. Returns `None` when the
    /// username is already taken.
    async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<Option<User>, AuthError>;
}
