//! In-Memory Document Store Adapter
//!
//! Keeps collections of JSON documents in memory.
//! Useful for testing, development and embedded use.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::{
    compare_values, lookup, new_document_id, validate_collection_name, Direction, DocumentStore, Filter,
    FindOptions, StorageError, Update,
};

/// In-memory document store.
///
/// Collections are created on first insert, like a document database would.
/// Cloning shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<BTreeMap<String, Vec<Value>>>>,
}

impl InMemoryDocumentStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all collections (useful for tests)
    pub async fn clear(&self) {
        self.collections.write().await.clear();
    }

    /// Number of documents in a collection
    pub async fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

/// Position of the matching document with the lowest `_id`.
fn first_match(docs: &[Value], filter: &Filter) -> Option<usize> {
    docs.iter()
        .enumerate()
        .filter(|(_, doc)| filter.matches(doc))
        .min_by(|(_, a), (_, b)| compare_values(lookup(a, "_id"), lookup(b, "_id")))
        .map(|(index, _)| index)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, collection: &str, mut document: Value) -> Result<String, StorageError> {
        validate_collection_name(collection)?;
        let Some(fields) = document.as_object_mut() else {
            return Err(StorageError::Serialization("document must be a JSON object".into()));
        };
        let id = match fields.get("_id") {
            None | Some(Value::Null) => new_document_id(),
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(StorageError::Serialization(format!("_id must be a string, got {other}")))
            }
        };
        fields.insert("_id".to_string(), Value::String(id.clone()));

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|doc| lookup(doc, "_id").and_then(Value::as_str) == Some(id.as_str())) {
            return Err(StorageError::Query(format!("duplicate _id '{id}' in {collection}")));
        }
        docs.push(document);
        Ok(id)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StorageError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(None);
        };
        Ok(first_match(docs, filter).map(|index| docs[index].clone()))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StorageError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&Value> = docs.iter().filter(|doc| filter.matches(doc)).collect();
        matched.sort_by(|a, b| {
            options
                .sort
                .iter()
                .map(|key| {
                    let ord = compare_values(lookup(a, &key.path), lookup(b, &key.path));
                    match key.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(matched.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StorageError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map_or(0, |docs| docs.iter().filter(|doc| filter.matches(doc)).count() as u64))
    }

    async fn update_one(&self, collection: &str, filter: &Filter, update: &Update) -> Result<u64, StorageError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let Some(index) = first_match(docs, filter) else {
            return Ok(0);
        };

        // Apply to a copy so a failing op leaves the stored document untouched.
        let mut updated = docs[index].clone();
        update.apply(&mut updated)?;
        docs[index] = updated;
        Ok(1)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StorageError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        match first_match(docs, filter) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn create_collection(&self, collection: &str) -> Result<(), StorageError> {
        validate_collection_name(collection)?;
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), StorageError> {
        self.collections.write().await.remove(collection);
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }
}
