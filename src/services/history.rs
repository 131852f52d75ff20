// src/services/history.rs
use crate::error::StorageError;
use crate::services::inference::ChatMessage;
use crate::storage::SharedStore;

/// Builds the context handed to the model for one request.
#[derive(Clone)]
pub struct HistoryAssembler {
    store: SharedStore,
    window: Option<usize>,
}

impl HistoryAssembler {
    /// `window` caps how many prior turns are included; `None` includes the
    /// whole session.
    pub fn new(store: SharedStore, window: Option<usize>) -> Self {
        Self { store, window }
    }

    /// Prior turns of `session_id` (oldest first, when `use_history` is set)
    /// followed by `new_message` as the final user entry.
    pub async fn assemble(
        &self,
        session_id: &str,
        use_history: bool,
        new_message: &str,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        if !use_history {
            return Ok(vec![ChatMessage::user(new_message)]);
        }

        let prior = self.store.read_history(session_id, self.window).await?;
        let mut context = Vec::with_capacity(prior.len() + 1);
        context.extend(prior.into_iter().map(|turn| ChatMessage {
            role: turn.role,
            content: turn.content,
        }));
        context.push(ChatMessage::user(new_message));
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::storage::{ConversationStore, ConversationTurn, MemoryStore, Role};

    async fn seeded(n: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for i in 0..n {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .append(&ConversationTurn::new("s", role, format!("turn {i}")))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn without_history_only_the_new_message() {
        let store = seeded(4).await;
        let assembler = HistoryAssembler::new(store, None);
        let context = assembler.assemble("s", false, "fresh").await.unwrap();
        assert_eq!(context, vec![ChatMessage::user("fresh")]);
    }

    #[tokio::test]
    async fn with_history_prior_turns_then_new_message() {
        let store = seeded(3).await;
        let assembler = HistoryAssembler::new(store, None);
        let context = assembler.assemble("s", true, "next").await.unwrap();
        assert_eq!(context.len(), 4);
        assert_eq!(context[0], ChatMessage::user("turn 0"));
        assert_eq!(context[1], ChatMessage::assistant("turn 1"));
        assert_eq!(context[2], ChatMessage::user("turn 2"));
        assert_eq!(context[3], ChatMessage::user("next"));
    }

    #[tokio::test]
    async fn window_keeps_most_recent_turns() {
        let store = seeded(10).await;
        let assembler = HistoryAssembler::new(store, Some(6));
        let context = assembler.assemble("s", true, "next").await.unwrap();
        assert_eq!(context.len(), 7);
        assert_eq!(context[0].content, "turn 4");
        assert_eq!(context[5].content, "turn 9");
        assert_eq!(context[6].content, "next");
    }

    #[tokio::test]
    async fn empty_session_gives_single_entry() {
        let assembler = HistoryAssembler::new(Arc::new(MemoryStore::new()), Some(6));
        let context = assembler.assemble("unknown", true, "hello").await.unwrap();
        assert_eq!(context, vec![ChatMessage::user("hello")]);
    }
}
