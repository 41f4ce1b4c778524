//! Logging configuration

use serde::Deserialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::error::{ConfigError, ValidationError};

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string, e.g. `info` or `threadstore=debug,sqlx=warn`.
    /// `RUST_LOG` wins when set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        EnvFilter::try_new(&self.level)
            .map(|_| ())
            .map_err(|_| ValidationError::InvalidLogLevel(self.level.clone()))
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Install a global tracing subscriber.
    ///
    /// Intended for binaries and test harnesses; the library itself only emits
    /// events. Fails if a global subscriber is already set.
    pub fn init_tracing(&self) -> Result<(), ConfigError> {
        let registry = tracing_subscriber::registry().with(self.env_filter());
        let result = if self.json {
            registry.with(fmt::layer().json().with_target(true)).try_init()
        } else {
            registry.with(fmt::layer().with_target(true)).try_init()
        };
        result.map_err(|e| ConfigError::Tracing(e.to_string()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
