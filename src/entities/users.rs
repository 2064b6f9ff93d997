use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// One of `basic`, `admin`, `manager`
    pub role: String,

    /// Opaque refresh token currently live for this user.
    /// Empty until first login; overwritten on every login/refresh.
    pub refresh_token: Option<String>,

    /// RFC3339 expiry for `refresh_token`. Only ever written together with it.
    pub refresh_token_expiry: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
