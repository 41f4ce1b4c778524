//! ChatStore - both stores wired to one document store.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::conversation_store::ConversationStore;
use super::message_store::MessageStore;
use super::migrations::{Direction, MigrationError, Migrator};
use super::storage_call::DEFAULT_OPERATION_TIMEOUT;
use crate::adapters::{InMemoryDocumentStore, PostgresDocumentStore};
use crate::config::{AppConfig, Backend, ConfigError};
use crate::ports::{DocumentStore, StorageError};

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to connect document store: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Entry point holding a [`ConversationStore`] and a [`MessageStore`] that
/// share one store handle.
#[derive(Clone)]
pub struct ChatStore {
    pub conversations: ConversationStore,
    pub messages: MessageStore,
    store: Arc<dyn DocumentStore>,
}

impl ChatStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_timeout(store, DEFAULT_OPERATION_TIMEOUT)
    }

    pub fn with_timeout(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        let conversations = ConversationStore::new(store.clone()).with_timeout(timeout);
        let messages = MessageStore::new(store.clone(), conversations.clone()).with_timeout(timeout);
        Self {
            conversations,
            messages,
            store,
        }
    }

    /// Builds the configured backend. For postgres, connects the pool and,
    /// when `database.run_migrations` is set, applies pending migrations.
    pub async fn connect(config: &AppConfig) -> Result<Self, ConnectError> {
        config.validate().map_err(ConfigError::from)?;

        let store: Arc<dyn DocumentStore> = match config.store.backend {
            Backend::Memory => Arc::new(InMemoryDocumentStore::new()),
            Backend::Postgres => {
                tracing::info!(url = %config.database.redacted_url(), "Connecting to PostgreSQL");
                Arc::new(PostgresDocumentStore::connect(&config.database).await?)
            }
        };

        let chat = Self::with_timeout(store, config.store.operation_timeout());
        if config.store.backend == Backend::Postgres && config.database.run_migrations {
            let ran = chat.migrator().run(Direction::Up).await?;
            tracing::info!(applied = ran.len(), "Pending migrations applied");
        }
        Ok(chat)
    }

    /// A migrator over this chat store's document store.
    pub fn migrator(&self) -> Migrator {
        Migrator::new(self.store.clone())
    }

    pub fn document_store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }
}
