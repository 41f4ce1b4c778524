//! Message record and creation input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::reaction::Reaction;
use crate::domain::conversation::ParticipantRef;
use crate::domain::foundation::{require_text, ConversationId, Metadata, MessageId, Timestamp, ValidationError};

/// Maximum content length, in characters.
pub const MAX_CONTENT_LEN: usize = 5000;
/// Maximum number of attachments per message.
pub const MAX_ATTACHMENTS: usize = 10;
/// Maximum attachment kind length, in characters.
pub const MAX_ATTACHMENT_KIND_LEN: usize = 100;

/// What produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Written by a participant.
    #[default]
    General,
    /// Emitted by the application (joins, leaves, notices).
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::General => "general",
            MessageKind::System => "system",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(MessageKind::General),
            "system" => Ok(MessageKind::System),
            other => Err(ValidationError::invalid_format(
                "kind",
                format!("expected one of general, system; got '{other}'"),
            )),
        }
    }
}

/// A file, image or other payload reference carried by a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Attachment {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A stored message.
///
/// `conversation_id` serializes to the same string form as the owning
/// conversation's `_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: ParticipantRef,
    pub kind: MessageKind,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reactions: Vec<Reaction>,
    pub created_at: Timestamp,
}

impl Message {
    /// The reaction bucket for `emoji`, if anyone reacted with it.
    pub fn reaction(&self, emoji: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.emoji == emoji)
    }
}

/// Input for creating a message.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMessage {
    pub kind: MessageKind,
    pub sender: ParticipantRef,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

impl CreateMessage {
    /// A general message with text content.
    pub fn text(sender: ParticipantRef, content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::General,
            sender,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Checks sender, content length, attachments and that the message
    /// carries content or at least one attachment.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.sender.validate()?;

        let content_len = self.content.chars().count();
        if content_len > MAX_CONTENT_LEN {
            return Err(ValidationError::out_of_range("content", 0, MAX_CONTENT_LEN, content_len));
        }
        if self.attachments.len() > MAX_ATTACHMENTS {
            return Err(ValidationError::out_of_range(
                "attachments",
                0,
                MAX_ATTACHMENTS,
                self.attachments.len(),
            ));
        }
        for attachment in &self.attachments {
            require_text("attachments.kind", &attachment.kind, MAX_ATTACHMENT_KIND_LEN)?;
        }
        if self.content.is_empty() && self.attachments.is_empty() {
            return Err(ValidationError::ContentOrAttachmentRequired);
        }
        Ok(())
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
