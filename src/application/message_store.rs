//! MessageStore - message lifecycle scoped to a conversation.

use std::sync::Arc;
use std::time::Duration;

use super::conversation_store::ConversationStore;
use super::error::ChatError;
use super::storage_call::{bounded, decode, encode, DEFAULT_OPERATION_TIMEOUT};
use super::MESSAGES;
use crate::domain::conversation::{Conversation, ParticipantRef};
use crate::domain::foundation::{
    require_text, validate_per_page, ConversationId, MessageId, Page, PageRequest, Timestamp,
};
use crate::domain::message::{CreateMessage, Message, ReactionToggle, MAX_EMOJI_LEN};
use crate::ports::{DocumentStore, Filter, FindOptions, SortKey, Update};

/// Message persistence, history paging and reactions.
///
/// Holds a [`ConversationStore`] to keep each conversation's `last_message`
/// in step with message creation.
#[derive(Clone)]
pub struct MessageStore {
    store: Arc<dyn DocumentStore>,
    conversations: ConversationStore,
    timeout: Duration,
}

impl MessageStore {
    pub fn new(store: Arc<dyn DocumentStore>, conversations: ConversationStore) -> Self {
        Self {
            store,
            conversations,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Sets the upper bound applied to every individual storage call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates a message and records it as the conversation's `last_message`.
    ///
    /// # Errors
    ///
    /// `PartialFailure` when the message was written but reading it back or
    /// the conversation update failed. The message document is not rolled back.
    pub async fn create(&self, conversation_id: &str, input: CreateMessage) -> Result<Message, ChatError> {
        let conversation_id = ConversationId::parse(conversation_id)?;
        input.validate()?;

        let conversation = self.require_conversation(&conversation_id).await?;

        let message = Message {
            id: MessageId::new(),
            conversation_id: conversation.id,
            sender: input.sender,
            kind: input.kind,
            content: input.content,
            attachments: input.attachments,
            reactions: Vec::new(),
            created_at: Timestamp::now(),
        };
        let doc = encode("encode message", &message)?;
        bounded(self.timeout, "insert message", self.store.insert(MESSAGES, doc)).await?;

        let written = async {
            let stored = self
                .load(&message.id)
                .await?
                .ok_or(ChatError::MessageNotFound(message.id))?;
            self.conversations
                .update_last_message(&conversation.id.to_string(), &stored)
                .await?;
            Ok::<_, ChatError>(stored)
        };
        let stored = match written.await {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(
                    conversation_id = %conversation.id,
                    message_id = %message.id,
                    error = %err,
                    "Message stored but follow-up failed"
                );
                return Err(ChatError::PartialFailure {
                    message_id: message.id,
                    source: Box::new(err),
                });
            }
        };

        tracing::info!(
            conversation_id = %conversation.id,
            message_id = %stored.id,
            kind = %stored.kind,
            attachments = stored.attachments.len(),
            "Message created"
        );
        Ok(stored)
    }

    /// Messages of a conversation, newest first, by page window.
    pub async fn paginate(
        &self,
        conversation_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Message>, ChatError> {
        let conversation_id = ConversationId::parse(conversation_id)?;
        let window = PageRequest::new(page, per_page)?;

        self.require_conversation(&conversation_id).await?;

        let filter = by_conversation(&conversation_id);
        let options = FindOptions::sorted_by(vec![SortKey::desc("created_at"), SortKey::desc("_id")])
            .skip(window.skip())
            .limit(window.limit());

        let docs = bounded(
            self.timeout,
            "find messages",
            self.store.find_many(MESSAGES, &filter, &options),
        )
        .await?;
        let total = bounded(self.timeout, "count messages", self.store.count(MESSAGES, &filter)).await?;

        let items = decode_all(docs)?;
        tracing::debug!(conversation_id = %conversation_id, page, per_page, total, "Messages paginated");
        Ok(Page::new(items, total))
    }

    /// Up to `per_page` messages older than `last_message_id` (exclusive), or
    /// the newest ones when no cursor is given. Newest first.
    pub async fn load_messages(
        &self,
        conversation_id: &str,
        last_message_id: Option<&str>,
        per_page: u32,
    ) -> Result<Vec<Message>, ChatError> {
        let conversation_id = ConversationId::parse(conversation_id)?;
        validate_per_page(per_page)?;
        let cursor = last_message_id
            .map(|raw| MessageId::parse("last_message_id", raw))
            .transpose()?;

        self.require_conversation(&conversation_id).await?;

        let mut filter = by_conversation(&conversation_id);
        if let Some(cursor) = cursor {
            filter = Filter::and(vec![filter, Filter::lt("_id", cursor.to_string())]);
        }
        let options = FindOptions::sorted_by(vec![SortKey::desc("_id")]).limit(u64::from(per_page));

        let docs = bounded(
            self.timeout,
            "load messages",
            self.store.find_many(MESSAGES, &filter, &options),
        )
        .await?;

        let messages = decode_all(docs)?;
        tracing::debug!(
            conversation_id = %conversation_id,
            cursor = ?cursor,
            returned = messages.len(),
            "Messages loaded"
        );
        Ok(messages)
    }

    /// Adds `participant` to the `emoji` reaction, or removes them if already
    /// there. Empty reactions are dropped. The whole `reactions` array is
    /// written back.
    pub async fn toggle_reaction(
        &self,
        message_id: &str,
        emoji: &str,
        participant: ParticipantRef,
    ) -> Result<Message, ChatError> {
        let id = MessageId::parse("message_id", message_id)?;
        require_text("emoji", emoji, MAX_EMOJI_LEN)?;
        participant.validate()?;

        let mut message = self.load(&id).await?.ok_or(ChatError::MessageNotFound(id))?;
        let toggle = message.toggle_reaction(emoji, &participant);

        let update = Update::new().set("reactions", encode("encode reactions", &message.reactions)?);
        let matched = bounded(
            self.timeout,
            "update reactions",
            self.store.update_one(MESSAGES, &Filter::id(id), &update),
        )
        .await?;
        if matched == 0 {
            return Err(ChatError::MessageNotFound(id));
        }

        tracing::info!(
            message_id = %id,
            emoji,
            participant_id = %participant.participant_id,
            added = matches!(toggle, ReactionToggle::Added),
            "Reaction toggled"
        );
        Ok(message)
    }

    /// Loads a message. `Ok(None)` when the id is well formed but unknown.
    pub async fn find(&self, message_id: &str) -> Result<Option<Message>, ChatError> {
        let id = MessageId::parse("message_id", message_id)?;
        self.load(&id).await
    }

    async fn load(&self, id: &MessageId) -> Result<Option<Message>, ChatError> {
        let doc = bounded(self.timeout, "find message", self.store.find_one(MESSAGES, &Filter::id(id))).await?;
        doc.map(|d| decode("decode message", d)).transpose()
    }

    async fn require_conversation(&self, id: &ConversationId) -> Result<Conversation, ChatError> {
        self.conversations
            .load(id)
            .await?
            .ok_or(ChatError::ConversationNotFound(*id))
    }
}

fn by_conversation(id: &ConversationId) -> Filter {
    Filter::eq("conversation_id", id.to_string())
}

fn decode_all(docs: Vec<serde_json::Value>) -> Result<Vec<Message>, ChatError> {
    docs.into_iter().map(|doc| decode("decode message", doc)).collect()
}
