//! ConversationStore - conversation lifecycle over a DocumentStore.

use std::sync::Arc;
use std::time::Duration;

use super::error::ChatError;
use super::storage_call::{bounded, decode, encode, DEFAULT_OPERATION_TIMEOUT};
use super::CONVERSATIONS;
use crate::domain::conversation::{
    Conversation, CreateConversation, Participant, ParticipantRef, MAX_PARTICIPANT_ID_LEN,
};
use crate::domain::foundation::{
    require_text, ConversationId, Metadata, Page, PageRequest, Timestamp, ValidationError,
};
use crate::domain::message::Message;
use crate::ports::{Condition, DocumentStore, Filter, FindOptions, SortKey, Update};

/// Conversation persistence and participant management.
///
/// Cheap to clone; clones share the underlying store handle.
#[derive(Clone)]
pub struct ConversationStore {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl ConversationStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Sets the upper bound applied to every individual storage call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates a conversation, or returns the existing one with exactly the
    /// same participant set.
    ///
    /// The lookup and the insert are separate round trips; two concurrent
    /// calls with the same set can both insert.
    pub async fn create(&self, input: CreateConversation) -> Result<Conversation, ChatError> {
        input.validate()?;

        if let Some(existing) = self.lookup_participant_set(&input.participants).await? {
            tracing::debug!(conversation_id = %existing.id, "Existing conversation matched participant set");
            return Ok(existing);
        }

        let now = Timestamp::now();
        let conversation = Conversation {
            id: ConversationId::new(),
            participants: input.participants.into_iter().map(Participant::from).collect(),
            metadata: input.metadata,
            last_message: None,
            created_at: now,
            updated_at: now,
        };

        let doc = encode("encode conversation", &conversation)?;
        bounded(self.timeout, "insert conversation", self.store.insert(CONVERSATIONS, doc)).await?;

        tracing::info!(
            conversation_id = %conversation.id,
            participants = conversation.participants.len(),
            "Conversation created"
        );
        Ok(conversation)
    }

    /// Loads a conversation. `Ok(None)` when the id is well formed but unknown.
    pub async fn find(&self, conversation_id: &str) -> Result<Option<Conversation>, ChatError> {
        let id = ConversationId::parse(conversation_id)?;
        self.load(&id).await
    }

    /// The conversation whose participant array is exactly `participants`
    /// (same size, every `(participant_id, metadata)` present), if any.
    pub async fn find_by_participants(
        &self,
        participants: &[ParticipantRef],
    ) -> Result<Option<Conversation>, ChatError> {
        if participants.is_empty() {
            return Err(ValidationError::empty_field("participants").into());
        }
        participants.iter().try_for_each(ParticipantRef::validate)?;
        self.lookup_participant_set(participants).await
    }

    /// Conversations that `participant_id` has ever been part of, most
    /// recently updated first.
    pub async fn paginate(
        &self,
        participant_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Conversation>, ChatError> {
        require_text("participant_id", participant_id, MAX_PARTICIPANT_ID_LEN)?;
        let window = PageRequest::new(page, per_page)?;

        let filter = Filter::elem_match("participants", vec![Condition::eq("participant_id", participant_id)]);
        let options = FindOptions::sorted_by(vec![SortKey::desc("updated_at")])
            .skip(window.skip())
            .limit(window.limit());

        let docs = bounded(
            self.timeout,
            "find conversations",
            self.store.find_many(CONVERSATIONS, &filter, &options),
        )
        .await?;
        let total = bounded(self.timeout, "count conversations", self.store.count(CONVERSATIONS, &filter)).await?;

        let items = docs
            .into_iter()
            .map(|doc| decode("decode conversation", doc))
            .collect::<Result<Vec<Conversation>, _>>()?;

        tracing::debug!(participant_id, page, per_page, total, "Conversations paginated");
        Ok(Page::new(items, total))
    }

    /// Adds `participant` to the conversation, unless a conversation with the
    /// resulting participant set already exists, in which case that one is
    /// returned and the addressed conversation is left untouched.
    pub async fn add_participant(
        &self,
        conversation_id: &str,
        participant: ParticipantRef,
    ) -> Result<Conversation, ChatError> {
        let id = ConversationId::parse(conversation_id)?;
        participant.validate()?;

        let mut conversation = self.load(&id).await?.ok_or(ChatError::ConversationNotFound(id))?;

        let candidates: Vec<ParticipantRef> = std::iter::once(participant.clone())
            .chain(conversation.participants.iter().map(Participant::to_ref))
            .collect();
        if let Some(existing) = self.lookup_participant_set(&candidates).await? {
            tracing::warn!(
                conversation_id = %id,
                redirected_to = %existing.id,
                "Participant set already has a conversation"
            );
            return Ok(existing);
        }

        let now = Timestamp::now();
        let member = Participant::from(participant);
        let update = Update::new()
            .push("participants", encode("encode participant", &member)?)
            .set("updated_at", encode("encode timestamp", &now)?);

        let matched = bounded(
            self.timeout,
            "add participant",
            self.store.update_one(CONVERSATIONS, &Filter::id(id), &update),
        )
        .await?;
        if matched == 0 {
            return Err(ChatError::ConversationNotFound(id));
        }

        tracing::info!(
            conversation_id = %id,
            participant_id = %member.participant_id,
            "Participant added"
        );
        conversation.participants.push(member);
        conversation.updated_at = now;
        Ok(conversation)
    }

    /// Soft-deletes every member matching the participant id and metadata
    /// exactly. `updated_at` is bumped even when nothing matched.
    pub async fn delete_participant(
        &self,
        conversation_id: &str,
        participant: ParticipantRef,
    ) -> Result<Conversation, ChatError> {
        let id = ConversationId::parse(conversation_id)?;
        participant.validate()?;

        let mut conversation = self.load(&id).await?.ok_or(ChatError::ConversationNotFound(id))?;

        let now = Timestamp::now();
        let stamp = encode("encode timestamp", &now)?;
        let update = Update::new()
            .set_where(
                "participants",
                identity_conditions(&participant),
                "deleted_at",
                stamp.clone(),
            )
            .set("updated_at", stamp);

        let matched = bounded(
            self.timeout,
            "delete participant",
            self.store.update_one(CONVERSATIONS, &Filter::id(id), &update),
        )
        .await?;
        if matched == 0 {
            return Err(ChatError::ConversationNotFound(id));
        }

        let mut removed = 0usize;
        for member in conversation.participants.iter_mut().filter(|m| m.matches(&participant)) {
            member.deleted_at = Some(now);
            removed += 1;
        }
        conversation.updated_at = now;

        tracing::info!(
            conversation_id = %id,
            participant_id = %participant.participant_id,
            removed,
            "Participant deleted"
        );
        Ok(conversation)
    }

    /// True when a member has `participant_id` and, for every key in
    /// `metadata`, the same value under that literal key. Deleted members
    /// count.
    pub async fn participant_exists(
        &self,
        conversation_id: &str,
        participant_id: &str,
        metadata: &Metadata,
    ) -> Result<bool, ChatError> {
        let id = ConversationId::parse(conversation_id)?;
        require_text("participant_id", participant_id, MAX_PARTICIPANT_ID_LEN)?;

        // Metadata keys are compared in process as literal keys.
        let filter = Filter::and(vec![
            Filter::id(id),
            Filter::elem_match("participants", vec![Condition::eq("participant_id", participant_id)]),
        ]);
        let doc = bounded(self.timeout, "check participant", self.store.find_one(CONVERSATIONS, &filter)).await?;

        let Some(doc) = doc else {
            return Ok(false);
        };
        let conversation: Conversation = decode("decode conversation", doc)?;
        Ok(conversation.has_participant(participant_id, metadata))
    }

    /// Overwrites `last_message` with a copy of `message` and sets
    /// `updated_at` to its creation time. No ordering check is made.
    pub async fn update_last_message(&self, conversation_id: &str, message: &Message) -> Result<(), ChatError> {
        let id = ConversationId::parse(conversation_id)?;

        let update = Update::new()
            .set("last_message", encode("encode message", message)?)
            .set("updated_at", encode("encode timestamp", &message.created_at)?);

        let matched = bounded(
            self.timeout,
            "update last message",
            self.store.update_one(CONVERSATIONS, &Filter::id(id), &update),
        )
        .await?;
        if matched == 0 {
            return Err(ChatError::ConversationNotFound(id));
        }

        tracing::debug!(conversation_id = %id, message_id = %message.id, "Last message updated");
        Ok(())
    }

    pub(crate) async fn load(&self, id: &ConversationId) -> Result<Option<Conversation>, ChatError> {
        let doc = bounded(
            self.timeout,
            "find conversation",
            self.store.find_one(CONVERSATIONS, &Filter::id(id)),
        )
        .await?;
        doc.map(|d| decode("decode conversation", d)).transpose()
    }

    async fn lookup_participant_set(
        &self,
        participants: &[ParticipantRef],
    ) -> Result<Option<Conversation>, ChatError> {
        let mut filters = vec![Filter::array_size("participants", participants.len())];
        filters.extend(
            participants
                .iter()
                .map(|p| Filter::elem_match("participants", identity_conditions(p))),
        );

        let doc = bounded(
            self.timeout,
            "find conversation by participants",
            self.store.find_one(CONVERSATIONS, &Filter::and(filters)),
        )
        .await?;
        doc.map(|d| decode("decode conversation", d)).transpose()
    }
}

/// `participant_id` and whole-metadata equality on one array element.
fn identity_conditions(participant: &ParticipantRef) -> Vec<Condition> {
    vec![
        Condition::eq("participant_id", participant.participant_id.as_str()),
        Condition::eq("metadata", participant.metadata.to_value()),
    ]
}
