//! Process configuration, sourced from environment variables.
//!
//! Mirrors the teacher's centralized-argument-handling posture
//! (`arguments.rs`'s `CMD_ARGS` singleton) but for environment-derived
//! settings: one struct assembled once at startup, passed down explicitly
//! rather than read from global state at each call site.

use crate::errors::CoreError;
use std::env;

/// Deployment environment; toggles TLS expectations on outbound
/// connections (broker, database).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_dsn: String,
    pub rabbitmq_url: Option<String>,
    pub env: Environment,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration for the `api`/`worker` subcommands, where the
    /// broker connection is required.
    pub fn load_with_broker(debug: bool) -> Result<Self, CoreError> {
        let mut cfg = Self::load(debug)?;
        if cfg.rabbitmq_url.is_none() {
            return Err(CoreError::validation("RABBITMQ_URL is required"));
        }
        cfg.debug = debug;
        Ok(cfg)
    }

    /// Load configuration for subcommands that only need the database
    /// (e.g. `seed`).
    pub fn load(debug: bool) -> Result<Self, CoreError> {
        let database_dsn = env::var("DATABASE_DSN")
            .map_err(|_| CoreError::validation("DATABASE_DSN is required"))?;

        let rabbitmq_url = env::var("RABBITMQ_URL").ok();

        let env = match env::var("ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        Ok(Self {
            database_dsn,
            rabbitmq_url,
            env,
            debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_dsn_is_a_validation_error() {
        std::env::remove_var("DATABASE_DSN");
        let result = AppConfig::load(false);
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }
}
