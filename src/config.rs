use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub app_base_url: String,
    pub auth: AuthConfig,
    pub smtp: SmtpConfig,
}

/// Signing secret and token/hash parameters, injected into the services at
/// startup rather than read from the environment at call time.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
    pub session_ttl_hours: i64,
    pub verification_ttl_hours: i64,
    pub reset_ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            app_base_url: get_env("APP_BASE_URL")?,
            auth: AuthConfig {
                jwt_secret: get_env("JWT_SECRET")?,
                bcrypt_cost: get_env_or_parse("BCRYPT_COST", 12)?,
                session_ttl_hours: get_env_or_parse("SESSION_TTL_HOURS", 24 * 7)?,
                verification_ttl_hours: get_env_or_parse("VERIFICATION_TTL_HOURS", 24)?,
                reset_ttl_hours: get_env_or_parse("RESET_TTL_HOURS", 1)?,
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST")?,
                port: get_env_or_parse("SMTP_PORT", 587)?,
                username: get_env("SMTP_USERNAME")?,
                password: get_env("SMTP_PASSWORD")?,
                from_address: get_env("SMTP_FROM")?,
            },
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or_parse<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
