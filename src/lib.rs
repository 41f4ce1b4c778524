//! Threadstore - Conversation and message persistence over a document store
//!
//! Conversations are deduplicated by participant set, participants are soft
//! deleted, message history pages by offset or by id cursor, and emoji
//! reactions toggle per participant.
//!
//! ```no_run
//! use std::sync::Arc;
//! use threadstore::adapters::InMemoryDocumentStore;
//! use threadstore::domain::conversation::{CreateConversation, ParticipantRef};
//! use threadstore::domain::message::CreateMessage;
//! use threadstore::ChatStore;
//!
//! # async fn run() -> Result<(), threadstore::ChatError> {
//! let chat = ChatStore::new(Arc::new(InMemoryDocumentStore::new()));
//! let conversation = chat
//!     .conversations
//!     .create(CreateConversation::new(vec![ParticipantRef::new("p1"), ParticipantRef::new("p2")]))
//!     .await?;
//! chat.messages
//!     .create(&conversation.id.to_string(), CreateMessage::text(ParticipantRef::new("p1"), "hi"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{ChatError, ChatStore, ConversationStore, MessageStore};
