use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    password::HashedSecret,
    repo_types::{NewUser, ProfileChanges, User},
};
use crate::error::StoreError;

/// Credential store. Postgres in production, in-memory in tests.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Active user whose email or username equals `identifier`.
    async fn find_active_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError>;
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Option<User>, StoreError>;
    async fn update_password(&self, id: Uuid, password: &HashedSecret) -> Result<bool, StoreError>;
}

const USER_COLUMNS: &str = "id, full_name, username, email, password_hash, role, phone, \
                            profile_picture, balance, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::from_sqlx("users", e)
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(db_err)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(db_err)
    }

    async fn find_active_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE (email = $1 OR username = $1) AND is_active \
             LIMIT 1"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(identifier)
            .fetch_optional(&self.db)
            .await
            .map_err(db_err)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (id, full_name, username, email, password_hash, role, phone, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.full_name)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.password.as_str())
            .bind(user.role)
            .bind(&user.phone)
            .bind(user.is_active)
            .fetch_one(&self.db)
            .await
            .map_err(db_err)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "UPDATE users SET \
                full_name = COALESCE($2, full_name), \
                phone = COALESCE($3, phone), \
                profile_picture = COALESCE($4, profile_picture), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.full_name)
            .bind(changes.phone)
            .bind(changes.profile_picture)
            .fetch_optional(&self.db)
            .await
            .map_err(db_err)
    }

    async fn update_password(&self, id: Uuid, password: &HashedSecret) -> Result<bool, StoreError> {
        let res = sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password.as_str())
            .execute(&self.db)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() == 1)
    }
}
