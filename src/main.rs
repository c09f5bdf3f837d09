mod app;
mod auth;
mod banners;
mod categories;
mod config;
mod error;
mod images;
mod response;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "kantin=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let addr = config.listen_addr()?;
    tracing::info!(production = config.production, base_url = %config.base_url, "configuration loaded");
    if config.jwt.cookie_expires_first() {
        tracing::warn!(
            cookie_days = config.jwt.cookie_expire_days,
            token_secs = config.jwt.expires_in.as_secs(),
            "JWT_COOKIE_EXPIRE is shorter than JWT_EXPIRE; sessions end when the cookie does"
        );
    }

    let state = AppState::init(config).await?;
    let app = app::build_app(state)?;
    app::serve(app, addr).await
}
