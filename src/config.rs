use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{bail, Context};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expires_in: Duration,
    pub cookie_expire_days: i64,
}

impl JwtConfig {
    /// The browser drops the session cookie before the token inside it expires.
    pub fn cookie_expires_first(&self) -> bool {
        let cookie_secs = u64::try_from(self.cookie_expire_days)
            .unwrap_or(0)
            .saturating_mul(86_400);
        Duration::from_secs(cookie_secs) < self.expires_in
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub production: bool,
    pub base_url: String,
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    /// Uploaded images are written here and served at `/public`.
    pub public_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let database_url = required("DATABASE_URL")?;

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "kantin".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "kantin-users".into()),
            expires_in: parse_expiry(&required("JWT_EXPIRE")?)?,
            cookie_expire_days: match get("JWT_COOKIE_EXPIRE") {
                Some(v) => v
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|d| *d > 0)
                    .with_context(|| format!("JWT_COOKIE_EXPIRE must be a positive number of days, got {v:?}"))?,
                None => 30,
            },
        };

        let port = match get("APP_PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("invalid APP_PORT {v:?}"))?,
            None => 9495,
        };

        let base_url = get("BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}/public"))
            .trim_end_matches('/')
            .to_string();

        let public_dir: PathBuf = get("PUBLIC_DIR").unwrap_or_else(|| "public".into()).into();

        Ok(Self {
            database_url,
            jwt,
            production: get("APP_ENV").as_deref() == Some("production"),
            base_url,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".into()),
            public_dir,
        })
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))?;
        Ok(addr)
    }
}

/// Parses token lifetimes such as `3600`, `90s`, `15m`, `12h`, `30d` or `2w`.
/// A bare number is seconds.
pub fn parse_expiry(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let amount: u64 = digits
        .parse()
        .with_context(|| format!("invalid JWT_EXPIRE {raw:?}"))?;
    let secs = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        other => bail!("invalid JWT_EXPIRE unit {other:?}"),
    };
    if amount == 0 {
        bail!("JWT_EXPIRE must be greater than zero");
    }
    Ok(Duration::from_secs(amount * secs))
}
