use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};

use crate::auth::policy::Role;
use crate::db::patch::UserPatch;
use crate::entities::users;

/// User data returned from the repository (without the password hash).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

/// Stored refresh-token state for a user, parsed from the row.
#[derive(Debug, Clone)]
pub struct RefreshTokenState {
    pub token: String,
    pub expiry: DateTime<Utc>,
}

fn to_user(model: users::Model) -> Result<User> {
    let role = Role::parse(&model.role)
        .with_context(|| format!("Unknown role '{}' for user {}", model.role, model.id))?;

    Ok(User {
        id: model.id,
        username: model.username,
        role,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// Token and expiry are only valid together; a row where either is missing or
/// the expiry fails to parse has no live refresh token.
fn refresh_state(model: &users::Model) -> Option<RefreshTokenState> {
    let token = model.refresh_token.clone()?;
    let raw_expiry = model.refresh_token_expiry.as_deref()?;
    let expiry = DateTime::parse_from_rfc3339(raw_expiry)
        .ok()?
        .with_timezone(&Utc);

    Some(RefreshTokenState { token, expiry })
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        user.map(to_user).transpose()
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        user.map(to_user).transpose()
    }

    /// Lookup for the login path: user plus stored password hash.
    pub async fn get_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        user.map(|u| {
            let password_hash = u.password_hash.clone();
            Ok((to_user(u)?, password_hash))
        })
        .transpose()
    }

    pub async fn get_password_hash(&self, id: i32) -> Result<Option<String>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password hash")?;

        Ok(user.map(|u| u.password_hash))
    }

    pub async fn get_refresh_state(
        &self,
        id: i32,
    ) -> Result<Option<(User, Option<RefreshTokenState>)>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for refresh token")?;

        user.map(|u| {
            let state = refresh_state(&u);
            Ok((to_user(u)?, state))
        })
        .transpose()
    }

    /// Create a user with empty auth fields. Returns `None` when the username
    /// is taken: the unique constraint is the authoritative signal, the
    /// pre-check only short-circuits the common case.
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Option<User>> {
        if self.get_by_username(username).await?.is_some() {
            return Ok(None);
        }

        let now = Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            role: Set(role.as_str().to_string()),
            refresh_token: Set(None),
            refresh_token_expiry: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(to_user(model)?)),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(None)
            }
            Err(err) => Err(err).context("Failed to insert user"),
        }
    }

    /// Apply a typed patch to a user row. Returns `false` if no such user.
    pub async fn update(&self, id: i32, patch: UserPatch) -> Result<bool> {
        if patch.is_empty() {
            return Ok(self.get_by_id(id).await?.is_some());
        }

        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();
        patch.apply(&mut active, Utc::now());
        active.update(&self.conn).await.context("Failed to update user")?;

        Ok(true)
    }

    /// Conditional rotation: replace the stored refresh token only while it
    /// still equals `presented`. Zero rows affected means a concurrent
    /// refresh rotated first and `presented` is no longer live.
    pub async fn swap_refresh_token(
        &self,
        id: i32,
        presented: &str,
        new_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<bool> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::RefreshToken, Expr::value(new_token))
            .col_expr(
                users::Column::RefreshTokenExpiry,
                Expr::value(expiry.to_rfc3339()),
            )
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(id))
            .filter(users::Column::RefreshToken.eq(presented))
            .exec(&self.conn)
            .await
            .context("Failed to rotate refresh token")?;

        Ok(result.rows_affected > 0)
    }
}
