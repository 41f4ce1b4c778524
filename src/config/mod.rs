//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `THREADSTORE` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use threadstore::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! config.logging.init_tracing().expect("Failed to install tracing");
//! ```

mod database;
mod error;
mod logging;
mod store;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use store::{Backend, StoreConfig};

use serde::Deserialize;

/// Root configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Backend selection and per-operation timeout
    #[serde(default)]
    pub store: StoreConfig,

    /// PostgreSQL connection (used by the postgres backend)
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `THREADSTORE__*` variables.
    ///
    /// # Environment Variable Format
    ///
    /// - `THREADSTORE__STORE__BACKEND=postgres` -> `store.backend = postgres`
    /// - `THREADSTORE__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("THREADSTORE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Database settings are only checked when the postgres backend is selected.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.store.validate()?;
        if self.store.backend == Backend::Postgres {
            self.database.validate()?;
        }
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use std::time::Duration;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "THREADSTORE__STORE__BACKEND",
        "THREADSTORE__STORE__OPERATION_TIMEOUT_MS",
        "THREADSTORE__DATABASE__URL",
        "THREADSTORE__DATABASE__MAX_CONNECTIONS",
        "THREADSTORE__LOGGING__LEVEL",
        "THREADSTORE__LOGGING__JSON",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults_without_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(config.store.backend, Backend::Memory);
        assert_eq!(config.store.operation_timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_postgres_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("THREADSTORE__STORE__BACKEND", "postgres");
        env::set_var("THREADSTORE__STORE__OPERATION_TIMEOUT_MS", "250");
        env::set_var("THREADSTORE__DATABASE__URL", "postgresql://test@localhost/chat");
        env::set_var("THREADSTORE__DATABASE__MAX_CONNECTIONS", "4");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.store.backend, Backend::Postgres);
        assert_eq!(config.store.operation_timeout_ms, 250);
        assert_eq!(config.database.url, "postgresql://test@localhost/chat");
        assert_eq!(config.database.max_connections, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_postgres_backend_requires_url() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("THREADSTORE__STORE__BACKEND", "postgres");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_memory_backend_ignores_database_section() {
        let config = AppConfig {
            database: DatabaseConfig::with_url("mysql://nope"),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_logging_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("THREADSTORE__LOGGING__LEVEL", "threadstore=debug");
        env::set_var("THREADSTORE__LOGGING__JSON", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.logging.level, "threadstore=debug");
        assert!(config.logging.json);
    }
}
