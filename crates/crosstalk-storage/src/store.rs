// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The store facade handed to the rest of the process.
//!
//! Wraps a [`Database`] handle and delegates to the typed query modules.
//! The process root owns one `Store` and shares it by reference; background
//! tasks receive the same reference and use it only inside their own task.

use crosstalk_core::types::{
    AssistantId, Client, ClientStatus, Conversation, ConversationStatus, Invocation,
    InvocationStatus, Message, MessageSearchHit, MessageStatus, QueueEntry,
};
use crosstalk_core::CrosstalkError;

use crate::database::Database;
use crate::queries;

/// Durable persistence for clients, conversations, messages, queue entries,
/// invocations, and shared context.
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Open the store at `path`, running migrations and PRAGMA setup.
    pub async fn open(path: &str) -> Result<Self, CrosstalkError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    /// Checkpoint the WAL ahead of process exit.
    pub async fn close(&self) -> Result<(), CrosstalkError> {
        self.db.close().await
    }

    // --- Clients ---

    pub async fn get_client(&self, id: AssistantId) -> Result<Option<Client>, CrosstalkError> {
        queries::clients::get_client(&self.db, id).await
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, CrosstalkError> {
        queries::clients::list_clients(&self.db).await
    }

    pub async fn update_client_presence(
        &self,
        id: AssistantId,
        status: ClientStatus,
        session_id: Option<String>,
    ) -> Result<(), CrosstalkError> {
        queries::clients::update_client_presence(&self.db, id, status, session_id).await
    }

    pub async fn reset_presence(&self) -> Result<(), CrosstalkError> {
        queries::clients::reset_presence(&self.db).await
    }

    // --- Conversations ---

    pub async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<(), CrosstalkError> {
        queries::conversations::create_conversation(&self.db, conversation).await
    }

    pub async fn get_conversation(
        &self,
        id: &str,
    ) -> Result<Option<Conversation>, CrosstalkError> {
        queries::conversations::get_conversation(&self.db, id).await
    }

    pub async fn list_conversations(
        &self,
        status: Option<ConversationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, CrosstalkError> {
        queries::conversations::list_conversations(&self.db, status, limit, offset).await
    }

    pub async fn update_conversation_status(
        &self,
        id: &str,
        status: ConversationStatus,
        summary: Option<String>,
    ) -> Result<(), CrosstalkError> {
        queries::conversations::update_conversation_status(&self.db, id, status, summary).await
    }

    // --- Messages ---

    /// Insert a message after checking its invariants: the conversation must
    /// exist and be active, sender and target must differ, content must be
    /// non-empty. Bumps the conversation's `updated_at`.
    pub async fn create_message(&self, message: &Message) -> Result<(), CrosstalkError> {
        if message.sender == message.target {
            return Err(CrosstalkError::Validation(
                "sender and target must differ".to_string(),
            ));
        }
        if message.content.is_empty() {
            return Err(CrosstalkError::Validation(
                "message content must not be empty".to_string(),
            ));
        }
        let conversation = self
            .get_conversation(&message.conversation_id)
            .await?
            .ok_or_else(|| {
                CrosstalkError::not_found("conversation", message.conversation_id.as_str())
            })?;
        if conversation.status != ConversationStatus::Active {
            return Err(CrosstalkError::Validation(format!(
                "conversation {} is {}, not active",
                conversation.id, conversation.status
            )));
        }
        queries::messages::insert_message(&self.db, message).await
    }

    pub async fn get_message(&self, id: &str) -> Result<Option<Message>, CrosstalkError> {
        queries::messages::get_message(&self.db, id).await
    }

    pub async fn get_history(
        &self,
        conversation_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, CrosstalkError> {
        queries::messages::get_history(&self.db, conversation_id, limit, offset).await
    }

    pub async fn update_message_status(
        &self,
        id: &str,
        status: MessageStatus,
    ) -> Result<(), CrosstalkError> {
        queries::messages::update_message_status(&self.db, id, status).await
    }

    pub async fn get_response_to_message(
        &self,
        id: &str,
    ) -> Result<Option<Message>, CrosstalkError> {
        queries::messages::get_response_to_message(&self.db, id).await
    }

    pub async fn search_messages(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<MessageSearchHit>, CrosstalkError> {
        queries::messages::search_messages(&self.db, query, limit).await
    }

    // --- Queue ---

    pub async fn enqueue_message(
        &self,
        message_id: &str,
        target: AssistantId,
        priority: i64,
        max_attempts: i64,
    ) -> Result<i64, CrosstalkError> {
        queries::queue::enqueue_message(&self.db, message_id, target, priority, max_attempts).await
    }

    pub async fn dequeue_messages(
        &self,
        target: AssistantId,
        limit: i64,
    ) -> Result<Vec<QueueEntry>, CrosstalkError> {
        queries::queue::dequeue_messages(&self.db, target, limit).await
    }

    pub async fn increment_attempts(
        &self,
        id: i64,
        delay_seconds: i64,
    ) -> Result<(), CrosstalkError> {
        queries::queue::increment_attempts(&self.db, id, delay_seconds).await
    }

    pub async fn remove_from_queue(&self, message_id: &str) -> Result<(), CrosstalkError> {
        queries::queue::remove_from_queue(&self.db, message_id).await
    }

    pub async fn clear_exhausted(&self) -> Result<usize, CrosstalkError> {
        queries::queue::clear_exhausted(&self.db).await
    }

    pub async fn get_queue_entry(
        &self,
        message_id: &str,
    ) -> Result<Option<QueueEntry>, CrosstalkError> {
        queries::queue::get_queue_entry(&self.db, message_id).await
    }

    // --- Invocations ---

    pub async fn create_invocation(
        &self,
        invocation: &Invocation,
    ) -> Result<(), CrosstalkError> {
        queries::invocations::create_invocation(&self.db, invocation).await
    }

    pub async fn mark_invocation_running(&self, id: &str) -> Result<(), CrosstalkError> {
        queries::invocations::mark_invocation_running(&self.db, id).await
    }

    pub async fn finalize_invocation(
        &self,
        id: &str,
        status: InvocationStatus,
        stdout: Option<String>,
        stderr: Option<String>,
        exit_code: Option<i64>,
    ) -> Result<(), CrosstalkError> {
        queries::invocations::finalize_invocation(&self.db, id, status, stdout, stderr, exit_code)
            .await
    }

    pub async fn get_invocation(&self, id: &str) -> Result<Option<Invocation>, CrosstalkError> {
        queries::invocations::get_invocation(&self.db, id).await
    }

    // --- Shared context ---

    pub async fn create_shared_context(
        &self,
        context: &crosstalk_core::types::SharedContext,
    ) -> Result<(), CrosstalkError> {
        queries::context::create_shared_context(&self.db, context).await
    }

    pub async fn get_shared_context(
        &self,
        id: &str,
    ) -> Result<Option<crosstalk_core::types::SharedContext>, CrosstalkError> {
        queries::context::get_shared_context(&self.db, id).await
    }

    pub async fn list_shared_context(
        &self,
        conversation_id: Option<String>,
        limit: i64,
    ) -> Result<Vec<crosstalk_core::types::SharedContext>, CrosstalkError> {
        queries::context::list_shared_context(&self.db, conversation_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::now_ts;
    use crosstalk_core::types::{MessageType, Priority};
    use tempfile::tempdir;

    async fn open_store() -> (Store, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("store.sqlite");
        let store = Store::open(db_path.to_str().unwrap()).await.unwrap();
        (store, dir)
    }

    fn make_conversation(id: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            title: None,
            project: None,
            status: ConversationStatus::Active,
            created_by: AssistantId::Claude,
            created_at: now_ts(),
            updated_at: now_ts(),
            summary: None,
            metadata: None,
            closed_at: None,
        }
    }

    fn make_message(id: &str, conversation_id: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            sender: AssistantId::Claude,
            target: AssistantId::Codex,
            content: "hello".to_string(),
            message_type: MessageType::Message,
            priority: Priority::Normal,
            status: MessageStatus::Pending,
            response_to_id: None,
            created_at: now_ts(),
            delivered_at: None,
            read_at: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn create_message_requires_existing_active_conversation() {
        let (store, _dir) = open_store().await;

        let missing = store.create_message(&make_message("m1", "nope")).await;
        assert!(matches!(
            missing,
            Err(CrosstalkError::NotFound { entity: "conversation", .. })
        ));

        store
            .create_conversation(&make_conversation("conv-1"))
            .await
            .unwrap();
        store
            .update_conversation_status("conv-1", ConversationStatus::Archived, None)
            .await
            .unwrap();
        let archived = store.create_message(&make_message("m1", "conv-1")).await;
        assert!(matches!(archived, Err(CrosstalkError::Validation(_))));

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn create_message_rejects_self_addressed() {
        let (store, _dir) = open_store().await;
        store
            .create_conversation(&make_conversation("conv-1"))
            .await
            .unwrap();

        let mut message = make_message("m1", "conv-1");
        message.target = AssistantId::Claude;
        let result = store.create_message(&message).await;
        assert!(matches!(result, Err(CrosstalkError::Validation(_))));

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn happy_path_message_flow() {
        let (store, _dir) = open_store().await;
        store
            .create_conversation(&make_conversation("conv-1"))
            .await
            .unwrap();
        store
            .create_message(&make_message("m1", "conv-1"))
            .await
            .unwrap();

        store
            .update_message_status("m1", MessageStatus::Delivered)
            .await
            .unwrap();
        let message = store.get_message("m1").await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Delivered);
        assert!(message.delivered_at.is_some());

        store.close().await.unwrap();
    }
}
