use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Token-signing configuration. Issuer, audience, and signing secret have no
/// usable defaults: `validate()` rejects a config that leaves them unset, so
/// the process refuses to start rather than mint tokens with an insecure key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// `iss` claim stamped into every access token.
    pub issuer: String,

    /// `aud` claim stamped into every access token.
    pub audience: String,

    /// HMAC-SHA-512 signing secret. Must be at least 32 bytes.
    /// Can also be supplied via the `CINECRIT_TOKEN_SECRET` env var.
    pub token_secret: String,

    /// Access token lifetime in seconds (default: 1 day).
    pub access_token_ttl_secs: i64,

    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            audience: String::new(),
            token_secret: String::new(),
            access_token_ttl_secs: 24 * 60 * 60,
            refresh_token_ttl_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7450,
            cors_allowed_origins: vec![
                "http://localhost:7450".to_string(),
                "http://127.0.0.1:7450".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/cinecrit.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Secrets can live outside the config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("CINECRIT_TOKEN_SECRET") {
            self.auth.token_secret = secret;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("cinecrit").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".cinecrit").join("config.toml"));
        }

        paths
    }

    /// Rejects configs that would start the service in an unusable or
    /// insecure state. Token minting must never fall back to a default key.
    pub fn validate(&self) -> Result<()> {
        if self.auth.issuer.trim().is_empty() {
            anyhow::bail!("auth.issuer must be set");
        }

        if self.auth.audience.trim().is_empty() {
            anyhow::bail!("auth.audience must be set");
        }

        if self.auth.token_secret.len() < 32 {
            anyhow::bail!("auth.token_secret must be at least 32 bytes");
        }

        if self.auth.access_token_ttl_secs <= 0 {
            anyhow::bail!("auth.access_token_ttl_secs must be > 0");
        }

        if self.auth.refresh_token_ttl_days <= 0 {
            anyhow::bail!("auth.refresh_token_ttl_days must be > 0");
        }

        Ok(())
    }
}
