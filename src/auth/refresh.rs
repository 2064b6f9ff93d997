//! Opaque refresh token generation, validation, and rotation.
//!
//! A refresh token carries no claims; its validity is decided solely by
//! comparison against the token and expiry stored on the user row. Exactly
//! one refresh token is live per user: every issuance overwrites the last.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use subtle::ConstantTimeEq;

use crate::db::Store;
use crate::db::repositories::user::User;

/// Generate an opaque refresh token: 32 bytes from the OS RNG, hex-encoded
/// (256 bits of entropy).
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

fn token_matches(presented: &str, stored: &str) -> bool {
    presented.as_bytes().ct_eq(stored.as_bytes()).into()
}

pub struct RefreshTokenManager {
    store: Store,
    ttl: Duration,
}

impl RefreshTokenManager {
    #[must_use]
    pub fn new(store: Store, ttl_days: i64) -> Self {
        Self {
            store,
            ttl: Duration::days(ttl_days),
        }
    }

    /// Mint a fresh token and persist it on the user row together with its
    /// expiry, replacing whatever token was live before (rotation-on-issue).
    pub async fn issue_and_store(&self, user_id: i32) -> Result<String> {
        let token = generate_token();
        let expiry = Utc::now() + self.ttl;
        let stored = self.store.set_refresh_token(user_id, &token, expiry).await?;
        anyhow::ensure!(stored, "no user with id {user_id}");
        Ok(token)
    }

    /// Replace the stored token only if it still equals `presented`.
    /// Returns the new token, or `None` when a concurrent refresh already
    /// rotated it away — the caller must treat that as unauthorized.
    pub async fn rotate(&self, user_id: i32, presented: &str) -> Result<Option<String>> {
        let token = generate_token();
        let expiry = Utc::now() + self.ttl;
        let swapped = self
            .store
            .swap_refresh_token(user_id, presented, &token, expiry)
            .await?;
        Ok(swapped.then_some(token))
    }

    /// Check `presented` against the stored token for `user_id`. Returns the
    /// user on success; callers are expected to rotate immediately.
    pub async fn validate(&self, user_id: i32, presented: &str) -> Result<Option<User>> {
        self.validate_at(user_id, presented, Utc::now()).await
    }

    pub async fn validate_at(
        &self,
        user_id: i32,
        presented: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let Some((user, state)) = self.store.get_refresh_state(user_id).await? else {
            return Ok(None);
        };

        let Some(state) = state else {
            return Ok(None);
        };

        if !token_matches(presented, &state.token) {
            return Ok(None);
        }

        if now > state.expiry {
            return Ok(None);
        }

        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn comparison_requires_exact_match() {
        let token = generate_token();
        assert!(token_matches(&token, &token));
        assert!(!token_matches(&token, &generate_token()));
        assert!(!token_matches(&token[..63], &token));
    }
}
