//! Property-based tests for dedup, reaction toggling and paging
//!
//! Uses proptest to generate participant sets and metadata, driving the
//! stores on a current-thread tokio runtime.

use proptest::prelude::*;
use std::sync::Arc;

use threadstore::adapters::InMemoryDocumentStore;
use threadstore::domain::conversation::{CreateConversation, ParticipantRef};
use threadstore::domain::foundation::{ConversationId, Metadata, MessageId, Timestamp};
use threadstore::domain::message::{CreateMessage, Message, MessageKind};
use threadstore::ChatStore;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn metadata_pairs() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..4)
        .prop_map(|m| m.into_iter().collect())
}

/// Distinct participant ids, each with some metadata entries.
fn participant_set() -> impl Strategy<Value = Vec<(String, Vec<(String, i64)>)>> {
    prop::collection::btree_map("[a-z0-9]{1,12}", metadata_pairs(), 2..6).prop_map(|m| m.into_iter().collect())
}

fn build(set: &[(String, Vec<(String, i64)>)], reverse_keys: bool) -> Vec<ParticipantRef> {
    set.iter()
        .map(|(id, pairs)| {
            let mut pairs = pairs.clone();
            if reverse_keys {
                pairs.reverse();
            }
            ParticipantRef::new(id.as_str()).with_metadata(pairs.into_iter().collect::<Metadata>())
        })
        .collect()
}

fn blank_message() -> Message {
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

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_create_is_idempotent_for_same_participant_set(set in participant_set(), rotate in 0usize..6) {
        let rt = runtime();
        rt.block_on(async {
            let chat = ChatStore::new(Arc::new(InMemoryDocumentStore::new()));

            let first = chat.conversations.create(CreateConversation::new(build(&set, false))).await.unwrap();

            let mut shuffled = build(&set, true);
            let len = shuffled.len();
            shuffled.rotate_left(rotate % len);
            let second = chat.conversations.create(CreateConversation::new(shuffled)).await.unwrap();

            prop_assert_eq!(first.id, second.id);
            Ok(())
        })?;
    }

    #[test]
    fn test_extra_participant_never_dedups(set in participant_set()) {
        let rt = runtime();
        rt.block_on(async {
            let chat = ChatStore::new(Arc::new(InMemoryDocumentStore::new()));
            let base = chat.conversations.create(CreateConversation::new(build(&set, false))).await.unwrap();

            let mut larger = build(&set, false);
            larger.push(ParticipantRef::new("extra-participant-id-that-is-long"));
            let bigger = chat.conversations.create(CreateConversation::new(larger)).await.unwrap();

            prop_assert_ne!(base.id, bigger.id);
            prop_assert_eq!(bigger.participants.len(), set.len() + 1);
            Ok(())
        })?;
    }

    #[test]
    fn test_toggle_twice_restores_reactions(emoji in "[a-z:]{1,10}", who in "[a-z]{1,8}", value in any::<i64>()) {
        let participant = ParticipantRef::new(who).with_metadata(Metadata::new().with("v", value));
        let mut message = blank_message();

        message.toggle_reaction(&emoji, &participant);
        prop_assert_eq!(message.reactions.len(), 1);
        message.toggle_reaction(&emoji, &participant);
        prop_assert!(message.reaction(&emoji).is_none());
    }

    #[test]
    fn test_two_reactors_commute(emoji in "[a-z:]{1,10}", a in "[a-m]{1,8}", b in "[n-z]{1,8}") {
        let first = ParticipantRef::new(a);
        let second = ParticipantRef::new(b);

        let mut ab = blank_message();
        ab.toggle_reaction(&emoji, &first);
        ab.toggle_reaction(&emoji, &second);

        let mut ba = blank_message();
        ba.toggle_reaction(&emoji, &second);
        ba.toggle_reaction(&emoji, &first);

        prop_assert_eq!(ab.reactions.len(), 1);
        prop_assert_eq!(ba.reactions.len(), 1);
        let bucket_ab = ab.reaction(&emoji).unwrap();
        let bucket_ba = ba.reaction(&emoji).unwrap();
        prop_assert_eq!(bucket_ab.participants.len(), 2);
        prop_assert!(bucket_ab.participants.iter().all(|p| bucket_ba.participants.contains(p)));
    }

    #[test]
    fn test_message_page_total_ignores_window(count in 0usize..12, page in 1u32..5, per_page in 1u32..6) {
        let rt = runtime();
        rt.block_on(async {
            let chat = ChatStore::new(Arc::new(InMemoryDocumentStore::new()));
            let conversation = chat
                .conversations
                .create(CreateConversation::new(vec![ParticipantRef::new("p1"), ParticipantRef::new("p2")]))
                .await
                .unwrap();
            let conv_id = conversation.id.to_string();
            for i in 0..count {
                let input = CreateMessage::text(ParticipantRef::new("p1"), format!("m{i}"));
                chat.messages.create(&conv_id, input).await.unwrap();
            }

            let result = chat.messages.paginate(&conv_id, page, per_page).await.unwrap();
            prop_assert_eq!(result.total, count as u64);
            prop_assert!(result.items.len() <= per_page as usize);
            let expected = count.saturating_sub(((page - 1) * per_page) as usize).min(per_page as usize);
            prop_assert_eq!(result.items.len(), expected);
            Ok(())
        })?;
    }
}
