//! PostgreSQL adapters - Database implementations for the document store port.
//!
//! - `PostgresDocumentStore` - JSONB-backed collections, one table each

mod postgres_document_store;
mod sql;

pub use postgres_document_store::PostgresDocumentStore;
