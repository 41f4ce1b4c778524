//! Conversation domain - conversations and their participants.

#[allow(clippy::module_inception)]
mod conversation;
mod participant;

pub use conversation::{Conversation, CreateConversation, MAX_PARTICIPANTS, MIN_PARTICIPANTS};
pub use participant::{Participant, ParticipantRef, MAX_PARTICIPANT_ID_LEN};
