//! Access token minting and verification.
//!
//! Tokens are self-contained HS512 JWTs. Once issued, their claims are
//! trusted on signature alone until expiry; nothing here re-checks the
//! database.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::policy::Role;
use crate::config::AuthConfig;
use crate::db::repositories::user::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Stable user id.
    #[serde(rename = "nameIdentifier")]
    pub name_identifier: i32,

    /// Username.
    pub name: String,

    pub role: Role,

    pub iss: String,

    pub aud: String,

    pub exp: usize,
}

pub struct TokenSigner {
    issuer: String,
    audience: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
}

impl TokenSigner {
    /// Fails when issuer, audience, or secret is missing or the secret is too
    /// short for a 256-bit HMAC key. Called at startup so a misconfigured
    /// deployment never reaches the point of minting tokens.
    pub fn from_config(cfg: &AuthConfig) -> Result<Self> {
        if cfg.issuer.trim().is_empty() {
            bail!("token issuer is not configured");
        }
        if cfg.audience.trim().is_empty() {
            bail!("token audience is not configured");
        }
        if cfg.token_secret.len() < 32 {
            bail!("token signing secret must be at least 32 bytes");
        }

        Ok(Self {
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            encoding_key: EncodingKey::from_secret(cfg.token_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(cfg.token_secret.as_bytes()),
            access_ttl: Duration::seconds(cfg.access_token_ttl_secs),
        })
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        let exp = now + self.access_ttl;
        let exp = usize::try_from(exp.timestamp()).context("token expiry before epoch")?;

        let claims = Claims {
            name_identifier: user.id,
            name: user.username.clone(),
            role: user.role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .context("failed to sign access token")
    }

    /// Full verification: signature, issuer, audience, and expiry.
    #[must_use]
    pub fn decode(&self, token: &str) -> Option<Claims> {
        self.decode_with(token, true)
    }

    /// Verification that tolerates an expired token. Used by the refresh path
    /// to extract the caller's identity from a structurally valid bearer.
    #[must_use]
    pub fn decode_expired(&self, token: &str) -> Option<Claims> {
        self.decode_with(token, false)
    }

    fn decode_with(&self, token: &str, validate_exp: bool) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.validate_exp = validate_exp;

        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()
    }
}
