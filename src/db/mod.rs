use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::auth::policy::Role;

pub mod migrator;
pub mod patch;
pub mod repositories;

pub use patch::UserPatch;
pub use repositories::user::{RefreshTokenState, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_username_with_password(username).await
    }

    pub async fn get_user_password_hash(&self, id: i32) -> Result<Option<String>> {
        self.user_repo().get_password_hash(id).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Option<User>> {
        self.user_repo().create(username, password_hash, role).await
    }

    pub async fn update_user(&self, id: i32, patch: UserPatch) -> Result<bool> {
        self.user_repo().update(id, patch).await
    }

    pub async fn get_refresh_state(
        &self,
        id: i32,
    ) -> Result<Option<(User, Option<RefreshTokenState>)>> {
        self.user_repo().get_refresh_state(id).await
    }

    pub async fn set_refresh_token(
        &self,
        id: i32,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<bool> {
        self.user_repo()
            .update(id, UserPatch::refresh_token(token, expiry))
            .await
    }

    pub async fn swap_refresh_token(
        &self,
        id: i32,
        presented: &str,
        new_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<bool> {
        self.user_repo()
            .swap_refresh_token(id, presented, new_token, expiry)
            .await
    }
}
