use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{claims::Role, password::HashedSecret};

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub role: Role,
    pub phone: Option<String>,
    pub profile_picture: String,
    pub balance: f64,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn secret(&self) -> HashedSecret {
        HashedSecret::from_stored(self.password_hash.clone())
    }
}

pub const DEFAULT_PROFILE_PICTURE: &str = "default-avatar.png";

/// Everything needed to insert a user. The secret is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: HashedSecret,
    pub role: Role,
    pub is_active: bool,
}

/// Profile fields a user may change about themselves. `None` leaves the
/// column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}
