use std::env;
use thiserror::Error;

use crate::passwords::DEFAULT_ROUNDS;

const LOCAL_SECRET_KEY: &str = "insecure-local-session-secret";
const DEFAULT_DATABASE_URL: &str = "sqlite://blog.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("{name} is not a valid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// AppConfig
///
/// Holds the application's configuration, read once from the process
/// environment at startup and then shared (immutably) through `AppState`.
#[derive(Clone)]
pub struct AppConfig {
    // Database connection string (SQLite file by default).
    pub db_url: String,
    // Key used to sign session and flash tokens.
    pub secret_key: String,
    pub bind_addr: String,
    // PBKDF2 iterations for newly hashed passwords.
    pub password_rounds: u32,
    // Runtime environment marker. Controls log format and cookie hardening.
    pub env: Env,
}

/// Env
///
/// Local development versus a production deployment.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe values for tests; nothing here is read from the environment.
    fn default() -> Self {
        Self {
            db_url: "sqlite::memory:".to_string(),
            secret_key: LOCAL_SECRET_KEY.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            password_rounds: DEFAULT_ROUNDS,
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads configuration from environment variables. Production refuses to
    /// start without an explicit `SECRET_KEY`; local runs fall back to a fixed
    /// development key.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let secret_key = match (env, env::var("SECRET_KEY")) {
            (_, Ok(key)) if !key.is_empty() => key,
            (Env::Production, _) => return Err(ConfigError::Missing("SECRET_KEY")),
            (Env::Local, _) => LOCAL_SECRET_KEY.to_string(),
        };

        let password_rounds = match env::var("PASSWORD_HASH_ROUNDS") {
            Ok(raw) => raw.parse::<u32>().ok().filter(|r| *r > 0).ok_or(
                ConfigError::Invalid {
                    name: "PASSWORD_HASH_ROUNDS",
                    value: raw,
                },
            )?,
            Err(_) => DEFAULT_ROUNDS,
        };

        Ok(Self {
            db_url: env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            secret_key,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            password_rounds,
            env,
        })
    }
}
