//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::password;
use crate::auth::policy::Role;
use crate::auth::refresh::RefreshTokenManager;
use crate::auth::token::TokenSigner;
use crate::config::SecurityConfig;
use crate::db::{Store, User, UserPatch};
use crate::services::auth_service::{
    AuthError, AuthService, LoginOutcome, LoginResult, PasswordIssue, TokenPair,
};

pub struct SeaOrmAuthService {
    store: Store,
    signer: Arc<TokenSigner>,
    refresh_tokens: RefreshTokenManager,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(
        store: Store,
        signer: Arc<TokenSigner>,
        refresh_tokens: RefreshTokenManager,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            signer,
            refresh_tokens,
            security,
        }
    }

    async fn mint_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let access_token = self
            .signer
            .issue(user)
            .map_err(|e| AuthError::Token(e.to_string()))?;
        let refresh_token = self.refresh_tokens.issue_and_store(user.id).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let Some((user, stored_hash)) = self
            .store
            .get_user_by_username_with_password(username)
            .await?
        else {
            return Ok(LoginOutcome::NotFound);
        };

        let is_valid = password::verify_blocking(password.to_string(), stored_hash).await?;
        if !is_valid {
            return Ok(LoginOutcome::IncorrectPassword);
        }

        let token_response = self.mint_pair(&user).await?;
        tracing::info!("User logged in: {}", user.username);

        Ok(LoginOutcome::Success(Box::new(LoginResult {
            username: user.username,
            is_logged_in: true,
            token_response,
        })))
    }

    async fn refresh(
        &self,
        user_id: i32,
        refresh_token: &str,
    ) -> Result<Option<TokenPair>, AuthError> {
        let Some(user) = self.refresh_tokens.validate(user_id, refresh_token).await? else {
            return Ok(None);
        };

        // Conditional rotation: a concurrent refresh that landed first makes
        // this one lose, same as an invalid token.
        let Some(rotated) = self.refresh_tokens.rotate(user_id, refresh_token).await? else {
            return Ok(None);
        };

        let access_token = self
            .signer
            .issue(&user)
            .map_err(|e| AuthError::Token(e.to_string()))?;

        Ok(Some(TokenPair {
            access_token,
            refresh_token: rotated,
        }))
    }

    async fn change_password(
        &self,
        target_user_id: i32,
        requesting_user_id: i32,
        old_password: &str,
        new_password: &str,
    ) -> Result<PasswordIssue, AuthError> {
        if target_user_id != requesting_user_id {
            return Ok(PasswordIssue::Unauthorized);
        }

        let Some(stored_hash) = self.store.get_user_password_hash(target_user_id).await? else {
            return Ok(PasswordIssue::NotFound);
        };

        let is_valid = password::verify_blocking(old_password.to_string(), stored_hash).await?;
        if !is_valid {
            return Ok(PasswordIssue::IncorrectOldPassword);
        }

        let new_hash =
            password::hash_blocking(new_password.to_string(), Some(self.security.clone())).await?;
        self.store
            .update_user(target_user_id, UserPatch::password_hash(new_hash))
            .await?;

        tracing::info!("Password changed for user id {target_user_id}");
        Ok(PasswordIssue::None)
    }

    async fn logout(&self, user_id: i32) -> Result<(), AuthError> {
        self.store
            .update_user(user_id, UserPatch::clear_refresh_token())
            .await?;
        Ok(())
    }

    async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<Option<User>, AuthError> {
        let hash =
            password::hash_blocking(password.to_string(), Some(self.security.clone())).await?;
        Ok(self.store.create_user(username, &hash, role).await?)
    }
}
