//! Application layer - the conversation and message stores.
//!
//! Stores validate input, translate operations into document store calls and
//! map failures onto [`ChatError`]. They hold no state beyond the store handle.

mod chat_store;
mod conversation_store;
mod error;
mod message_store;
pub mod migrations;
mod storage_call;

pub use chat_store::{ChatStore, ConnectError};
pub use conversation_store::ConversationStore;
pub use error::ChatError;
pub use message_store::MessageStore;
pub use storage_call::DEFAULT_OPERATION_TIMEOUT;

/// Collection holding conversation documents.
pub const CONVERSATIONS: &str = "conversations";
/// Collection holding message documents.
pub const MESSAGES: &str = "messages";
/// Collection recording applied migration versions.
pub const MIGRATIONS: &str = "migrations";
