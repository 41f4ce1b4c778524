//! Collection migrations.
//!
//! Applied versions are recorded in the `migrations` collection as
//! `{_id, timestamp}`; only `timestamp` is read back, so records written by
//! other tools with their own ids still count. Versions are unix timestamps,
//! so ascending version order is authoring order.

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Field holding the applied version in a bookkeeping record.
const RECORD_FIELD: &str = "timestamp";
use thiserror::Error;

use super::{CONVERSATIONS, MESSAGES, MIGRATIONS};
use crate::ports::{DocumentStore, Filter, FindOptions, SortKey, StorageError};

/// Which way to run migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl FromStr for Direction {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(MigrationError::InvalidDirection(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("invalid direction '{0}', expected 'up' or 'down'")]
    InvalidDirection(String),

    #[error("migration {version} ({name}) failed: {source}")]
    Failed {
        version: i64,
        name: String,
        #[source]
        source: StorageError,
    },

    #[error("migration bookkeeping failed: {0}")]
    Bookkeeping(#[from] StorageError),
}

/// One reversible schema step.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Unix timestamp identifying the migration.
    fn version(&self) -> i64;

    fn name(&self) -> &str;

    async fn up(&self, store: &dyn DocumentStore) -> Result<(), StorageError>;

    async fn down(&self, store: &dyn DocumentStore) -> Result<(), StorageError>;
}

/// Creates the `conversations` and `messages` collections.
pub struct CreateCollections;

#[async_trait]
impl Migration for CreateCollections {
    fn version(&self) -> i64 {
        1739673768
    }

    fn name(&self) -> &str {
        "create_collections"
    }

    async fn up(&self, store: &dyn DocumentStore) -> Result<(), StorageError> {
        store.create_collection(CONVERSATIONS).await?;
        store.create_collection(MESSAGES).await
    }

    async fn down(&self, store: &dyn DocumentStore) -> Result<(), StorageError> {
        store.drop_collection(MESSAGES).await?;
        store.drop_collection(CONVERSATIONS).await
    }
}

/// Applies and reverts registered migrations against a store.
pub struct Migrator {
    store: Arc<dyn DocumentStore>,
    migrations: Vec<Box<dyn Migration>>,
}

impl Migrator {
    /// A migrator with the built-in migrations registered.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            migrations: vec![Box::new(CreateCollections)],
        }
    }

    pub fn with_migration(mut self, migration: Box<dyn Migration>) -> Self {
        self.migrations.push(migration);
        self
    }

    /// Versions currently recorded as applied, ascending.
    pub async fn applied(&self) -> Result<Vec<i64>, MigrationError> {
        self.ensure_bookkeeping().await?;
        let docs = self
            .store
            .find_many(MIGRATIONS, &Filter::All, &FindOptions::sorted_by(vec![SortKey::asc(RECORD_FIELD)]))
            .await?;
        Ok(docs
            .iter()
            .filter_map(|doc| doc.get(RECORD_FIELD).and_then(serde_json::Value::as_i64))
            .collect())
    }

    /// Runs every pending migration (`Up`, ascending) or every applied one
    /// (`Down`, descending). Returns the versions that were run.
    ///
    /// Stops at the first failure; migrations before it stay recorded.
    pub async fn run(&self, direction: Direction) -> Result<Vec<i64>, MigrationError> {
        let applied: BTreeSet<i64> = self.applied().await?.into_iter().collect();

        let mut ordered: Vec<&dyn Migration> = self.migrations.iter().map(|m| m.as_ref()).collect();
        ordered.sort_by_key(|m| m.version());
        if direction == Direction::Down {
            ordered.reverse();
        }

        let mut ran = Vec::new();
        for migration in ordered {
            let version = migration.version();
            let is_applied = applied.contains(&version);

            match direction {
                Direction::Up if is_applied => {
                    tracing::debug!(version, "Migration already applied");
                }
                Direction::Down if !is_applied => {
                    tracing::debug!(version, "Migration not applied");
                }
                Direction::Up => {
                    migration
                        .up(self.store.as_ref())
                        .await
                        .map_err(|source| failed(migration, source))?;
                    self.store
                        .insert(MIGRATIONS, json!({ "_id": version.to_string(), RECORD_FIELD: version }))
                        .await?;
                    tracing::info!(version, name = migration.name(), "Migration applied");
                    ran.push(version);
                }
                Direction::Down => {
                    migration
                        .down(self.store.as_ref())
                        .await
                        .map_err(|source| failed(migration, source))?;
                    self.store
                        .delete_one(MIGRATIONS, &Filter::eq(RECORD_FIELD, version))
                        .await?;
                    tracing::info!(version, name = migration.name(), "Migration reverted");
                    ran.push(version);
                }
            }
        }
        Ok(ran)
    }

    async fn ensure_bookkeeping(&self) -> Result<(), StorageError> {
        let existing = self.store.list_collections().await?;
        if !existing.iter().any(|name| name == MIGRATIONS) {
            self.store.create_collection(MIGRATIONS).await?;
        }
        Ok(())
    }
}

fn failed(migration: &dyn Migration, source: StorageError) -> MigrationError {
    MigrationError::Failed {
        version: migration.version(),
        name: migration.name().to_string(),
        source,
    }
}
