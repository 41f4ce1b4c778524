//! Emoji reactions and the toggle state transition.

use serde::{Deserialize, Serialize};

use super::message::Message;
use crate::domain::conversation::ParticipantRef;

/// Everyone who reacted to a message with one emoji.
///
/// A stored bucket always has at least one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    #[serde(default)]
    pub participants: Vec<ParticipantRef>,
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionToggle {
    /// The participant now reacts with the emoji.
    Added,
    /// The participant's reaction was withdrawn.
    Removed,
}

impl Message {
    /// Adds the participant to the emoji's bucket, or removes them if they
    /// are already in it. Identity is participant id plus metadata.
    ///
    /// Buckets left empty are dropped.
    pub fn toggle_reaction(&mut self, emoji: &str, participant: &ParticipantRef) -> ReactionToggle {
        let outcome = match self.reactions.iter_mut().find(|r| r.emoji == emoji) {
            Some(bucket) => match bucket.participants.iter().position(|p| p == participant) {
                Some(index) => {
                    bucket.participants.remove(index);
                    ReactionToggle::Removed
                }
                None => {
                    bucket.participants.push(participant.clone());
                    ReactionToggle::Added
                }
            },
            None => {
                self.reactions.push(Reaction {
                    emoji: emoji.to_string(),
                    participants: vec![participant.clone()],
                });
                ReactionToggle::Added
            }
        };

        self.reactions.retain(|r| !r.participants.is_empty());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ConversationId, Metadata, MessageId, Timestamp};
    use crate::domain::message::MessageKind;

    fn message() -> Message {
        Message {
            id: MessageId::new(),
            conversation_id: ConversationId::new(),
            sender: ParticipantRef::new("author"),
            kind: MessageKind::General,
            content: "hi".into(),
            attachments: vec![],
            reactions: vec![],
            created_at: Timestamp::now(),
        }
    }

    fn with_business(id: &str, business: &str) -> ParticipantRef {
        ParticipantRef::new(id).with_metadata(Metadata::new().with("business_id", business))
    }

    #[test]
    fn first_reaction_creates_a_bucket() {
        let mut msg = message();
        let outcome = msg.toggle_reaction("👍", &ParticipantRef::new("p1"));

        assert_eq!(outcome, ReactionToggle::Added);
        assert_eq!(msg.reactions.len(), 1);
        assert_eq!(msg.reactions[0].emoji, "👍");
        assert_eq!(msg.reactions[0].participants, vec![ParticipantRef::new("p1")]);
    }

    #[test]
    fn toggling_twice_removes_the_bucket() {
        let mut msg = message();
        let p1 = ParticipantRef::new("p1");
        msg.toggle_reaction("👍", &p1);
        let outcome = msg.toggle_reaction("👍", &p1);

        assert_eq!(outcome, ReactionToggle::Removed);
        assert!(msg.reactions.is_empty());
    }

    #[test]
    fn second_participant_joins_existing_bucket() {
        let mut msg = message();
        msg.toggle_reaction("👍", &ParticipantRef::new("p1"));
        msg.toggle_reaction("👍", &ParticipantRef::new("p2"));

        assert_eq!(msg.reactions.len(), 1);
        assert_eq!(msg.reactions[0].participants.len(), 2);
    }

    #[test]
    fn same_id_with_different_metadata_is_a_different_reactor() {
        let mut msg = message();
        msg.toggle_reaction("👍", &with_business("p1", "b1"));
        let outcome = msg.toggle_reaction("👍", &with_business("p1", "b2"));

        assert_eq!(outcome, ReactionToggle::Added);
        assert_eq!(msg.reactions[0].participants.len(), 2);
    }

    #[test]
    fn removing_one_reactor_keeps_the_others() {
        let mut msg = message();
        msg.toggle_reaction("👍", &ParticipantRef::new("p1"));
        msg.toggle_reaction("👍", &ParticipantRef::new("p2"));
        msg.toggle_reaction("👍", &ParticipantRef::new("p1"));

        assert_eq!(msg.reactions[0].participants, vec![ParticipantRef::new("p2")]);
    }

    #[test]
    fn emojis_are_separate_buckets_in_first_use_order() {
        let mut msg = message();
        msg.toggle_reaction("👍", &ParticipantRef::new("p1"));
        msg.toggle_reaction("🎉", &ParticipantRef::new("p1"));

        let emojis: Vec<_> = msg.reactions.iter().map(|r| r.emoji.as_str()).collect();
        assert_eq!(emojis, vec!["👍", "🎉"]);
        assert!(msg.reaction("🎉").is_some());
    }

    #[test]
    fn removing_from_one_bucket_leaves_other_buckets_alone() {
        let mut msg = message();
        msg.toggle_reaction("👍", &ParticipantRef::new("p1"));
        msg.toggle_reaction("🎉", &ParticipantRef::new("p2"));
        msg.toggle_reaction("👍", &ParticipantRef::new("p1"));

        assert!(msg.reaction("👍").is_none());
        assert_eq!(msg.reaction("🎉").unwrap().participants.len(), 1);
    }
}
