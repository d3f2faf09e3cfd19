use std::{env, path::PathBuf, str::FromStr};

use anyhow::Context;
use chrono::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub covers_dir: PathBuf,
    pub upload_tmp_dir: PathBuf,
    pub cors_origin: Option<String>,
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
    pub log_dir: String,
    pub admin: AdminSeed,
}

/// Account created at startup when the users table has no admin yet.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            database_url: var("DATABASE_URL", "sqlite:./rateshelf.db"),
            host: var("HOST", "0.0.0.0"),
            port: parse_or(&lookup, "PORT", 3000)?,
            access_token_secret: lookup("ACCESS_TOKEN_SECRET")
                .context("Please set ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: lookup("REFRESH_TOKEN_SECRET")
                .context("Please set REFRESH_TOKEN_SECRET")?,
            access_token_ttl: Duration::minutes(parse_or(&lookup, "ACCESS_TOKEN_TTL_MINUTES", 15)?),
            refresh_token_ttl: Duration::days(parse_or(&lookup, "REFRESH_TOKEN_TTL_DAYS", 10)?),
            covers_dir: PathBuf::from(var("COVERS_DIR", "covers")),
            upload_tmp_dir: PathBuf::from(var("UPLOAD_TMP_DIR", "public/temp")),
            cors_origin: lookup("CORS_ORIGIN").filter(|origin| !origin.is_empty()),
            cookie_secure: lookup("COOKIE_SECURE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(true),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 2 * 1024 * 1024)?,
            log_dir: var("LOG_DIR", "logs"),
            admin: AdminSeed {
                username: var("ADMIN_USERNAME", "admin"),
                email: var("ADMIN_EMAIL", "admin@localhost"),
                password: var("ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
