//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, metadata, pagination windows and the
//! validation errors that form the vocabulary of the conversation domain.

mod errors;
mod ids;
mod metadata;
mod pagination;
mod timestamp;

pub use errors::{require_range, require_text, ErrorCode, ValidationError};
pub use ids::{ConversationId, MessageId};
pub use metadata::{maps_equal, values_equal, Metadata};
pub use pagination::{validate_per_page, Page, PageRequest, MAX_PER_PAGE};
pub use timestamp::Timestamp;
