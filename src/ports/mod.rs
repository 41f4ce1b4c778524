//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the stores and the outside world. Adapters implement these ports.
//!
//! - `DocumentStore` - collection-level find/insert/update/count on JSON documents
//! - `Filter`, `Update`, `FindOptions` - the query vocabulary passed through it

mod document_store;
mod query;

pub use document_store::{new_document_id, validate_collection_name, DocumentStore, StorageError};
pub use query::{compare_values, lookup, Condition, Direction, Filter, FindOptions, SortKey, Update, UpdateOp};
