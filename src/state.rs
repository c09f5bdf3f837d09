use std::sync::Arc;

use anyhow::Context;

use crate::{
    auth::{
        jwt::JwtKeys,
        repo::{PgUserRepo, UserRepo},
    },
    banners::repo::{BannerRepo, PgBannerRepo},
    categories::repo::{CategoryRepo, PgCategoryRepo},
    config::AppConfig,
    storage::{DiskStorage, StorageClient},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtKeys>,
    pub users: Arc<dyn UserRepo>,
    pub banners: Arc<dyn BannerRepo>,
    pub categories: Arc<dyn CategoryRepo>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and opens the public image
    /// directory.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connecting to DATABASE_URL")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("running migrations")?;

        let storage: Arc<dyn StorageClient> = Arc::new(DiskStorage::new(config.public_dir.clone()));

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserRepo::new(db.clone())),
            Arc::new(PgBannerRepo::new(db.clone())),
            Arc::new(PgCategoryRepo::new(db)),
            storage,
        ))
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserRepo>,
        banners: Arc<dyn BannerRepo>,
        categories: Arc<dyn CategoryRepo>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        Self {
            jwt: Arc::new(JwtKeys::from(&config.jwt)),
            config: Arc::new(config),
            users,
            banners,
            categories,
            storage,
        }
    }
}
