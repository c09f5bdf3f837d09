use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: Uuid,
    pub title: String,
    pub image: String,
    pub is_show: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewBanner {
    pub title: String,
    pub image: String,
    pub is_show: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BannerChanges {
    pub title: Option<String>,
    pub image: Option<String>,
    pub is_show: Option<bool>,
}

#[async_trait]
pub trait BannerRepo: Send + Sync {
    /// Newest first. `search` matches words of the title.
    async fn list(&self, search: Option<&str>, limit: i64, offset: i64) -> Result<(Vec<Banner>, i64), StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Banner>, StoreError>;
    async fn create(&self, banner: NewBanner) -> Result<Banner, StoreError>;
    async fn update(&self, id: Uuid, changes: BannerChanges) -> Result<Option<Banner>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgBannerRepo {
    db: PgPool,
}

impl PgBannerRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::from_sqlx("banners", e)
}

#[async_trait]
impl BannerRepo for PgBannerRepo {
    async fn list(&self, search: Option<&str>, limit: i64, offset: i64) -> Result<(Vec<Banner>, i64), StoreError> {
        let rows = sqlx::query_as::<_, Banner>(
            r#"
            SELECT id, title, image, is_show, created_at, updated_at
              FROM banners
             WHERE $1::text IS NULL
                OR to_tsvector('simple', title) @@ plainto_tsquery('simple', $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .map_err(db_err)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
              FROM banners
             WHERE $1::text IS NULL
                OR to_tsvector('simple', title) @@ plainto_tsquery('simple', $1)
            "#,
        )
        .bind(search)
        .fetch_one(&self.db)
        .await
        .map_err(db_err)?;

        Ok((rows, total))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Banner>, StoreError> {
        sqlx::query_as::<_, Banner>(
            r#"SELECT id, title, image, is_show, created_at, updated_at FROM banners WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(db_err)
    }

    async fn create(&self, banner: NewBanner) -> Result<Banner, StoreError> {
        sqlx::query_as::<_, Banner>(
            r#"
            INSERT INTO banners (id, title, image, is_show)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, image, is_show, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&banner.title)
        .bind(&banner.image)
        .bind(banner.is_show)
        .fetch_one(&self.db)
        .await
        .map_err(db_err)
    }

    async fn update(&self, id: Uuid, changes: BannerChanges) -> Result<Option<Banner>, StoreError> {
        sqlx::query_as::<_, Banner>(
            r#"
            UPDATE banners SET
                title = COALESCE($2, title),
                image = COALESCE($3, image),
                is_show = COALESCE($4, is_show),
                updated_at = now()
             WHERE id = $1
            RETURNING id, title, image, is_show, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.image)
        .bind(changes.is_show)
        .fetch_optional(&self.db)
        .await
        .map_err(db_err)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM banners WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() == 1)
    }
}
