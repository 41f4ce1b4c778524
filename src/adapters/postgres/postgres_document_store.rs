//! PostgreSQL implementation of DocumentStore.
//!
//! Each collection is a table `(id TEXT PRIMARY KEY, doc JSONB NOT NULL)`.

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder, Row};

use super::sql::{push_filter, push_order_by};
use crate::config::DatabaseConfig;
use crate::ports::{
    new_document_id, validate_collection_name, DocumentStore, Filter, FindOptions, StorageError, Update,
};

const UNDEFINED_TABLE: &str = "42P01";
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL implementation of DocumentStore.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgresDocumentStore over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds a pool from configuration and connects.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .max_lifetime(config.max_lifetime())
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL document store"
        );
        Ok(Self::new(pool))
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Quoted table identifier for a validated collection name.
fn table(collection: &str) -> Result<String, StorageError> {
    validate_collection_name(collection)?;
    Ok(format!("\"{collection}\""))
}

fn map_err(collection: &str, action: &str, err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNDEFINED_TABLE) => {
            StorageError::CollectionMissing(collection.to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            StorageError::Connection(format!("Failed to {action} in {collection}: {err}"))
        }
        _ => StorageError::Query(format!("Failed to {action} in {collection}: {err}")),
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn insert(&self, collection: &str, mut document: Value) -> Result<String, StorageError> {
        let table = table(collection)?;
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

        sqlx::query(&format!("INSERT INTO {table} (id, doc) VALUES ($1, $2)"))
            .bind(&id)
            .bind(&document)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                    StorageError::Query(format!("duplicate _id '{id}' in {collection}"))
                }
                _ => map_err(collection, "insert document", e),
            })?;

        Ok(id)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StorageError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT doc FROM {} WHERE ", table(collection)?));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY id COLLATE \"C\" ASC LIMIT 1");

        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_err(collection, "find document", e))?;

        row.map(|r| r.try_get::<Value, _>("doc"))
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StorageError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT doc FROM {} WHERE ", table(collection)?));
        push_filter(&mut qb, filter);
        push_order_by(&mut qb, &options.sort);
        if let Some(limit) = options.limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if options.skip > 0 {
            qb.push(" OFFSET ");
            qb.push_bind(i64::try_from(options.skip).unwrap_or(i64::MAX));
        }

        qb.build()
            .fetch(&self.pool)
            .map_err(|e| map_err(collection, "find documents", e))
            .and_then(|row| async move {
                row.try_get::<Value, _>("doc")
                    .map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .try_collect()
            .await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StorageError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) AS n FROM {} WHERE ", table(collection)?));
        push_filter(&mut qb, filter);

        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(collection, "count documents", e))?;
        let n: i64 = row.try_get("n").map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(n.max(0) as u64)
    }

    async fn update_one(&self, collection: &str, filter: &Filter, update: &Update) -> Result<u64, StorageError> {
        let table = table(collection)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to start transaction: {e}")))?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT id, doc FROM {table} WHERE "));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY id COLLATE \"C\" ASC LIMIT 1 FOR UPDATE");

        let Some(row) = qb
            .build()
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_err(collection, "lock document", e))?
        else {
            return Ok(0);
        };

        let id: String = row.try_get("id").map_err(|e| StorageError::Query(e.to_string()))?;
        let mut doc: Value = row
            .try_get("doc")
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        update.apply(&mut doc)?;

        sqlx::query(&format!("UPDATE {table} SET doc = $1 WHERE id = $2"))
            .bind(&doc)
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_err(collection, "update document", e))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Query(format!("Failed to commit transaction: {e}")))?;
        Ok(1)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StorageError> {
        let table = table(collection)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "DELETE FROM {table} WHERE id = (SELECT id FROM {table} WHERE "
        ));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY id COLLATE \"C\" ASC LIMIT 1)");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_err(collection, "delete document", e))?;
        Ok(result.rows_affected())
    }

    async fn create_collection(&self, collection: &str) -> Result<(), StorageError> {
        let table = table(collection)?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (id TEXT PRIMARY KEY, doc JSONB NOT NULL)"
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| map_err(collection, "create collection", e))?;
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), StorageError> {
        let table = table(collection)?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&self.pool)
            .await
            .map_err(|e| map_err(collection, "drop collection", e))?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT c.table_name AS name
            FROM information_schema.columns c
            WHERE c.table_schema = current_schema()
              AND c.column_name = 'doc'
              AND c.data_type = 'jsonb'
            ORDER BY c.table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(format!("Failed to list collections: {e}")))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(|e| StorageError::Query(e.to_string())))
            .collect()
    }
}
