//! Typed partial updates for the `users` table.
//!
//! Every mutable auth field goes through [`UserPatch`], so the set of fields
//! a write can touch is an explicit contract. The refresh token and its
//! expiry are a single field here: they can only be set or cleared together.

use chrono::{DateTime, Utc};
use sea_orm::Set;

use crate::entities::users;

#[derive(Debug, Clone)]
pub enum RefreshTokenPatch {
    Set {
        token: String,
        expiry: DateTime<Utc>,
    },
    Clear,
}

#[derive(Debug, Default, Clone)]
pub struct UserPatch {
    pub password_hash: Option<String>,
    pub refresh_token: Option<RefreshTokenPatch>,
}

impl UserPatch {
    #[must_use]
    pub fn password_hash(hash: impl Into<String>) -> Self {
        Self {
            password_hash: Some(hash.into()),
            refresh_token: None,
        }
    }

    #[must_use]
    pub fn refresh_token(token: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self {
            password_hash: None,
            refresh_token: Some(RefreshTokenPatch::Set {
                token: token.into(),
                expiry,
            }),
        }
    }

    #[must_use]
    pub const fn clear_refresh_token() -> Self {
        Self {
            password_hash: None,
            refresh_token: Some(RefreshTokenPatch::Clear),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.password_hash.is_none() && self.refresh_token.is_none()
    }

    pub fn apply(self, active: &mut users::ActiveModel, now: DateTime<Utc>) {
        if let Some(hash) = self.password_hash {
            active.password_hash = Set(hash);
        }

        match self.refresh_token {
            Some(RefreshTokenPatch::Set { token, expiry }) => {
                active.refresh_token = Set(Some(token));
                active.refresh_token_expiry = Set(Some(expiry.to_rfc3339()));
            }
            Some(RefreshTokenPatch::Clear) => {
                active.refresh_token = Set(None);
                active.refresh_token_expiry = Set(None);
            }
            None => {}
        }

        active.updated_at = Set(now.to_rfc3339());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveValue;

    fn unset_model() -> users::ActiveModel {
        users::ActiveModel {
            ..Default::default()
        }
    }

    #[test]
    fn setting_refresh_token_writes_token_and_expiry_together() {
        let now = Utc::now();
        let expiry = now + chrono::Duration::days(7);
        let mut active = unset_model();

        UserPatch::refresh_token("abc123", expiry).apply(&mut active, now);

        assert_eq!(
            active.refresh_token,
            ActiveValue::Set(Some("abc123".to_string()))
        );
        assert_eq!(
            active.refresh_token_expiry,
            ActiveValue::Set(Some(expiry.to_rfc3339()))
        );
        assert_eq!(active.updated_at, ActiveValue::Set(now.to_rfc3339()));
        // Untouched fields stay untouched.
        assert!(matches!(active.password_hash, ActiveValue::NotSet));
    }

    #[test]
    fn clearing_refresh_token_clears_both_columns() {
        let now = Utc::now();
        let mut active = unset_model();

        UserPatch::clear_refresh_token().apply(&mut active, now);

        assert_eq!(active.refresh_token, ActiveValue::Set(None));
        assert_eq!(active.refresh_token_expiry, ActiveValue::Set(None));
    }

    #[test]
    fn password_patch_only_touches_hash_and_timestamp() {
        let now = Utc::now();
        let mut active = unset_model();

        UserPatch::password_hash("$argon2id$new").apply(&mut active, now);

        assert_eq!(
            active.password_hash,
            ActiveValue::Set("$argon2id$new".to_string())
        );
        assert!(matches!(active.refresh_token, ActiveValue::NotSet));
        assert!(matches!(active.refresh_token_expiry, ActiveValue::NotSet));
    }

    #[test]
    fn default_patch_is_empty() {
        assert!(UserPatch::default().is_empty());
        assert!(!UserPatch::clear_refresh_token().is_empty());
    }
}
