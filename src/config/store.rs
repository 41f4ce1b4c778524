//! Store backend selection and per-operation limits

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Which DocumentStore implementation backs the chat store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Process-local, non-persistent
    #[default]
    Memory,
    /// PostgreSQL JSONB tables
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,

    /// Upper bound on every individual storage call, in milliseconds
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl StoreConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.operation_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

fn default_operation_timeout_ms() -> u64 {
    5_000
}
