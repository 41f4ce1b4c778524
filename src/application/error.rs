//! Errors returned by the conversation and message stores.

use thiserror::Error;

use crate::domain::foundation::{ConversationId, ErrorCode, MessageId, ValidationError};
use crate::ports::StorageError;

/// Failure of a store operation.
///
/// Validation errors are raised before any storage call. A well-formed id that
/// matches nothing is `*NotFound` only for operations that need the record;
/// plain reads return `None` instead.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    /// A document store call failed; `step` names which one.
    #[error("Storage error during {step}: {source}")]
    Storage {
        step: &'static str,
        #[source]
        source: StorageError,
    },

    /// The message was written but the conversation's `last_message` was not.
    /// The message document is left in place for reconciliation.
    #[error("Message {message_id} stored but conversation update failed: {source}")]
    PartialFailure {
        message_id: MessageId,
        #[source]
        source: Box<ChatError>,
    },
}

impl ChatError {
    pub fn storage(step: &'static str, source: StorageError) -> Self {
        ChatError::Storage { step, source }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ChatError::Validation(_) => ErrorCode::ValidationFailed,
            ChatError::ConversationNotFound(_) => ErrorCode::ConversationNotFound,
            ChatError::MessageNotFound(_) => ErrorCode::MessageNotFound,
            ChatError::Storage {
                source: StorageError::Timeout(_),
                ..
            } => ErrorCode::StorageTimeout,
            ChatError::Storage { .. } => ErrorCode::StorageError,
            ChatError::PartialFailure { .. } => ErrorCode::PartialFailure,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ChatError::ConversationNotFound(_) | ChatError::MessageNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_the_variant() {
        let validation: ChatError = ValidationError::empty_field("participant_id").into();
        assert_eq!(validation.code(), ErrorCode::ValidationFailed);
        assert_eq!(
            ChatError::ConversationNotFound(ConversationId::new()).code(),
            ErrorCode::ConversationNotFound
        );
        assert_eq!(
            ChatError::storage("insert message", StorageError::Query("boom".into())).code(),
            ErrorCode::StorageError
        );
    }

    #[test]
    fn elapsed_storage_calls_report_timeout() {
        let err = ChatError::storage("find conversation", StorageError::Timeout(50));
        assert_eq!(err.code(), ErrorCode::StorageTimeout);
        assert_eq!(err.code().to_string(), "STORAGE_TIMEOUT");
    }

    #[test]
    fn partial_failure_keeps_the_cause() {
        let cause = ChatError::storage("update last message", StorageError::Connection("reset".into()));
        let err = ChatError::PartialFailure {
            message_id: MessageId::new(),
            source: Box::new(cause),
        };
        assert_eq!(err.code(), ErrorCode::PartialFailure);
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_not_found());
    }

    #[test]
    fn validation_message_is_transparent() {
        let err: ChatError = ValidationError::ContentOrAttachmentRequired.into();
        assert_eq!(err.to_string(), "A message needs content or at least one attachment");
    }
}
