//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - in-memory document store for tests and embedded use
//! - `postgres` - PostgreSQL JSONB document store

pub mod memory;
pub mod postgres;

pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
