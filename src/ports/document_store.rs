//! Document store port.
//!
//! The minimal collection-level contract the conversation and message stores
//! are written against. Documents are JSON objects whose `_id` is a string.
//!
//! # Guarantees
//!
//! - Each call is atomic for the single document it touches, nothing more.
//!   Multi-call sequences (lookup then insert) are not transactional.
//! - Generated ids are time ordered, so `_id` order is creation order.
//! - Dropping a returned future abandons the in-flight operation.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::query::{Filter, FindOptions, Update};

/// Errors raised by document store adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("document serialization failed: {0}")]
    Serialization(String),

    #[error("invalid collection name '{0}'")]
    InvalidCollection(String),

    #[error("collection '{0}' does not exist")]
    CollectionMissing(String),

    #[error("operation timed out after {0} ms")]
    Timeout(u64),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Generates a time-ordered document id.
pub fn new_document_id() -> String {
    Uuid::now_v7().to_string()
}

/// Collection-level access to a document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns its `_id`, generating one if absent.
    ///
    /// # Errors
    ///
    /// - `Serialization` if the document is not a JSON object
    /// - `Query` if a document with the same `_id` exists
    async fn insert(&self, collection: &str, document: Value) -> Result<String, StorageError>;

    /// Returns the first matching document in `_id` order.
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StorageError>;

    /// Returns matching documents after sorting, skipping and limiting.
    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StorageError>;

    /// Counts matching documents.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StorageError>;

    /// Applies `update` to the first matching document and returns the number
    /// of documents matched (0 or 1).
    async fn update_one(&self, collection: &str, filter: &Filter, update: &Update) -> Result<u64, StorageError>;

    /// Deletes the first matching document and returns the number deleted.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StorageError>;

    /// Creates an empty collection. Creating an existing collection is a no-op.
    async fn create_collection(&self, collection: &str) -> Result<(), StorageError>;

    /// Drops a collection and its documents. Dropping a missing collection is a no-op.
    async fn drop_collection(&self, collection: &str) -> Result<(), StorageError>;

    /// Names of existing collections, sorted.
    async fn list_collections(&self) -> Result<Vec<String>, StorageError>;
}

/// Collection names are restricted to `[a-z_][a-z0-9_]*` (at most 63 chars).
pub fn validate_collection_name(name: &str) -> Result<(), StorageError> {
    let mut chars = name.chars();
    let valid = name.len() <= 63
        && chars.next().is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidCollection(name.to_string()))
    }
}
