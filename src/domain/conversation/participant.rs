//! Participant identity and membership records.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{require_text, Metadata, Timestamp, ValidationError};

/// Maximum length of a participant id, in characters.
pub const MAX_PARTICIPANT_ID_LEN: usize = 100;

/// Who someone is: an id plus the metadata that qualifies it.
///
/// Two refs with the same id but different metadata are different
/// participants. Used for conversation members, message senders and
/// reactors alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub participant_id: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ParticipantRef {
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Checks the id is present and at most 100 characters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("participant_id", &self.participant_id, MAX_PARTICIPANT_ID_LEN)
    }
}

/// A conversation member. Removal is a soft delete via `deleted_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Participant {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Identity match: same id and equal metadata. Ignores `deleted_at`.
    pub fn matches(&self, other: &ParticipantRef) -> bool {
        self.participant_id == other.participant_id && self.metadata == other.metadata
    }

    pub fn to_ref(&self) -> ParticipantRef {
        ParticipantRef {
            participant_id: self.participant_id.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl From<ParticipantRef> for Participant {
    fn from(r: ParticipantRef) -> Self {
        Self {
            participant_id: r.participant_id,
            metadata: r.metadata,
            deleted_at: None,
        }
    }
}
