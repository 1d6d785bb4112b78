use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Process-wide configuration, read from the environment exactly once at
/// startup. A missing required value aborts the process before the server
/// binds; nothing here is ever reloaded per request.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_lifetime_hours: i64,
    pub b2_key_id: String,
    pub b2_key: String,
    pub b2_bucket_id: String,
    pub diagnosis_api_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(AppConfig {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_lifetime_hours: env::var("JWT_LIFETIME_HOURS")
                .unwrap_or_else(|_| "12".to_string())
                .parse()
                .context("JWT_LIFETIME_HOURS must be a whole number of hours")?,
            b2_key_id: required("B2_APPLICATION_KEY_ID")?,
            b2_key: required("B2_APPLICATION_KEY")?,
            b2_bucket_id: required("B2_BUCKET_ID")?,
            diagnosis_api_url: env::var("DIAGNOSIS_API_URL")
                .unwrap_or_else(|_| "http://api.endlessmedical.com/v1/dx".to_string()),
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}
