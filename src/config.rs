/*
 * Responsibility
 * - Load settings from the environment (.env supported)
 * - Validate them (missing or malformed values fail startup)
 */
use std::fmt;
use std::time::Duration;

use crate::services::auth::token_issuer::{
    ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL, TRANSACTION_TOKEN_TTL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub app_env: AppEnv,
    pub auth_issuer: String,
    pub auth_audience: String,
    // Signs access and refresh tokens
    pub access_jwt_private_key_pem: String,
    // Verifies them; also the source of the `kid` header
    pub access_jwt_public_key_pem: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub transaction_token_ttl: Duration,
    pub access_token_leeway_seconds: u64,
    // Ordered; assigned to custom bits at startup
    pub custom_grants: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = AppEnv::parse(var("APP_ENV"));

        let auth_issuer = var("AUTH_ISSUER").ok_or(ConfigError::Missing("AUTH_ISSUER"))?;
        let auth_audience = var("AUTH_AUDIENCE").ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

        let access_jwt_private_key_pem = var("ACCESS_JWT_PRIVATE_KEY_PEM")
            .ok_or(ConfigError::Missing("ACCESS_JWT_PRIVATE_KEY_PEM"))?
            .replace("\\n", "\n");
        let access_jwt_public_key_pem = var("ACCESS_JWT_PUBLIC_KEY_PEM")
            .ok_or(ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM"))?
            .replace("\\n", "\n");

        let access_token_ttl = seconds(&var, "ACCESS_TOKEN_TTL_SECONDS", ACCESS_TOKEN_TTL)?; // 1 h
        let refresh_token_ttl = seconds(&var, "REFRESH_TOKEN_TTL_SECONDS", REFRESH_TOKEN_TTL)?; // 24 h
        let transaction_token_ttl =
            seconds(&var, "TRANSACTION_TOKEN_TTL_SECONDS", TRANSACTION_TOKEN_TTL)?; // 5 min
        let access_token_leeway_seconds =
            seconds(&var, "ACCESS_TOKEN_LEEWAY_SECONDS", Duration::from_secs(60))?.as_secs();

        let custom_grants = var("CUSTOM_GRANTS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        Ok(Self {
            app_env,
            auth_issuer,
            auth_audience,
            access_jwt_private_key_pem,
            access_jwt_public_key_pem,
            access_token_ttl,
            refresh_token_ttl,
            transaction_token_ttl,
            access_token_leeway_seconds,
            custom_grants,
        })
    }
}

fn seconds<F>(var: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid(key)),
    }
}
