//! Conversation record and creation input.

use serde::{Deserialize, Serialize};

use super::participant::{Participant, ParticipantRef};
use crate::domain::foundation::{require_range, ConversationId, Metadata, Timestamp, ValidationError};
use crate::domain::message::Message;

/// Smallest participant set a conversation can be created with.
pub const MIN_PARTICIPANTS: usize = 2;
/// Largest participant set a conversation can be created with.
pub const MAX_PARTICIPANTS: usize = 10;

/// A stored conversation.
///
/// `participants` keeps insertion order and never shrinks; removed members
/// carry a `deleted_at` marker. `last_message` is a full copy of the most
/// recently created message, not a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: ConversationId,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Conversation {
    /// True when a member, deleted or not, has `participant_id` and carries
    /// every key of `metadata` with an equal value.
    ///
    /// Keys are literal: `"org.id"` names one key, not a nested path.
    pub fn has_participant(&self, participant_id: &str, metadata: &Metadata) -> bool {
        self.participants
            .iter()
            .any(|p| p.participant_id == participant_id && p.metadata.contains(metadata))
    }
}

/// Input for creating (or finding) a conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateConversation {
    pub participants: Vec<ParticipantRef>,
    pub metadata: Metadata,
}

impl CreateConversation {
    pub fn new(participants: Vec<ParticipantRef>) -> Self {
        Self {
            participants,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Checks the participant count is within `[2, 10]` and every id is valid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_range(
            "participants",
            self.participants.len(),
            MIN_PARTICIPANTS,
            MAX_PARTICIPANTS,
        )?;
        self.participants.iter().try_for_each(ParticipantRef::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(ids: &[&str]) -> Vec<ParticipantRef> {
        ids.iter().map(|id| ParticipantRef::new(*id)).collect()
    }

    #[test]
    fn single_participant_is_rejected() {
        let err = CreateConversation::new(refs(&["p1"])).validate().unwrap_err();
        assert_eq!(err, ValidationError::out_of_range("participants", 2, 10, 1));
    }

    #[test]
    fn eleven_participants_are_rejected() {
        let ids: Vec<String> = (0..11).map(|i| format!("p{i}")).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        assert!(CreateConversation::new(refs(&ids)).validate().is_err());
    }

    #[test]
    fn blank_participant_id_is_rejected() {
        assert!(CreateConversation::new(refs(&["p1", ""])).validate().is_err());
    }

    #[test]
    fn two_valid_participants_pass() {
        assert!(CreateConversation::new(refs(&["p1", "p2"])).validate().is_ok());
    }

    fn conversation_with(participants: Vec<Participant>) -> Conversation {
        let now = Timestamp::now();
        Conversation {
            id: ConversationId::new(),
            participants,
            metadata: Metadata::new(),
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn has_participant_counts_soft_deleted_members() {
        let mut deleted = Participant::from(ParticipantRef::new("p2"));
        deleted.deleted_at = Some(Timestamp::now());
        let conversation = conversation_with(vec![Participant::from(ParticipantRef::new("p1")), deleted]);

        assert!(conversation.has_participant("p2", &Metadata::new()));
        assert!(!conversation.has_participant("p3", &Metadata::new()));
    }

    #[test]
    fn has_participant_treats_dotted_keys_literally() {
        let member = ParticipantRef::new("p1").with_metadata(Metadata::new().with("org.id", "7"));
        let conversation = conversation_with(vec![Participant::from(member)]);

        assert!(conversation.has_participant("p1", &Metadata::new().with("org.id", "7")));
        assert!(!conversation.has_participant("p1", &Metadata::new().with("org.id", "8")));
    }

    #[test]
    fn has_participant_requires_queried_keys_to_be_present() {
        let conversation = conversation_with(vec![Participant::from(ParticipantRef::new("p1"))]);

        assert!(!conversation.has_participant("p1", &Metadata::new().with("role", serde_json::json!({}))));
        assert!(!conversation.has_participant("p1", &Metadata::new().with("role", serde_json::Value::Null)));
    }
}
