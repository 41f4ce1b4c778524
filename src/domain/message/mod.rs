//! Message domain - messages, attachments and reactions.

#[allow(clippy::module_inception)]
mod message;
mod reaction;

pub use message::{
    Attachment, CreateMessage, Message, MessageKind, MAX_ATTACHMENTS, MAX_ATTACHMENT_KIND_LEN,
    MAX_CONTENT_LEN,
};
pub use reaction::{Reaction, ReactionToggle};

/// Maximum emoji key length, in characters.
pub const MAX_EMOJI_LEN: usize = 100;
