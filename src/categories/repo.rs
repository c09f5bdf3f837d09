use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub icon: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    /// Newest first. `search` is a case-insensitive substring of the name.
    async fn list(&self, search: Option<&str>, limit: i64, offset: i64) -> Result<(Vec<Category>, i64), StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    async fn create(&self, category: NewCategory) -> Result<Category, StoreError>;
    async fn update(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// `%term%` for ILIKE with the pattern metacharacters escaped.
pub fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[derive(Clone)]
pub struct PgCategoryRepo {
    db: PgPool,
}

impl PgCategoryRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::from_sqlx("categories", e)
}

const CATEGORY_COLUMNS: &str = "id, name, slug, description, icon, created_at, updated_at";

#[async_trait]
impl CategoryRepo for PgCategoryRepo {
    async fn list(&self, search: Option<&str>, limit: i64, offset: i64) -> Result<(Vec<Category>, i64), StoreError> {
        let pattern = search.map(like_pattern);

        let rows = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories
              WHERE $1::text IS NULL OR name ILIKE $1
              ORDER BY created_at DESC
              LIMIT $2 OFFSET $3"
        ))
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .map_err(db_err)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM categories WHERE $1::text IS NULL OR name ILIKE $1",
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.db)
        .await
        .map_err(db_err)?;

        Ok((rows, total))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(db_err)
    }

    async fn create(&self, category: NewCategory) -> Result<Category, StoreError> {
        sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (id, name, slug, description, icon)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.icon)
        .fetch_one(&self.db)
        .await
        .map_err(db_err)
    }

    async fn update(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>, StoreError> {
        sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET
                 name = COALESCE($2, name),
                 slug = COALESCE($3, slug),
                 description = COALESCE($4, description),
                 icon = COALESCE($5, icon),
                 updated_at = now()
              WHERE id = $1
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.slug)
        .bind(changes.description)
        .bind(changes.icon)
        .fetch_optional(&self.db)
        .await
        .map_err(db_err)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() == 1)
    }
}
