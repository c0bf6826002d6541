// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background queue processor.
//!
//! Drains due queue entries for assistants that have come online, retries
//! failures with exponential backoff, and periodically sweeps entries whose
//! attempts are exhausted.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crosstalk_core::types::{AssistantId, MessageStatus, QueueEntry};
use crosstalk_core::{ClientRegistry, CrosstalkError};
use crosstalk_storage::Store;

/// How many entries one drain pass takes per assistant.
const DRAIN_BATCH: i64 = 10;

/// Base retry delay in seconds; doubles per attempt.
const RETRY_BASE_SECONDS: i64 = 30;

/// Ceiling on the retry delay.
const RETRY_MAX_SECONDS: i64 = 3600;

/// Periodically delivers queued messages to assistants that are online.
pub struct QueueProcessor {
    store: Store,
    registry: Arc<ClientRegistry>,
    poll_interval: Duration,
    sweep_interval: Duration,
}

impl QueueProcessor {
    pub fn new(store: Store, registry: Arc<ClientRegistry>) -> Self {
        Self {
            store,
            registry,
            poll_interval: Duration::from_millis(5000),
            sweep_interval: Duration::from_secs(300),
        }
    }

    /// Shorten the loop intervals (used by tests).
    pub fn with_intervals(mut self, poll: Duration, sweep: Duration) -> Self {
        self.poll_interval = poll;
        self.sweep_interval = sweep;
        self
    }

    /// Run the drain and sweep loops until cancelled.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut poll = tokio::time::interval(self.poll_interval);
            let mut sweep = tokio::time::interval(self.sweep_interval);
            // Skip the immediate first ticks.
            poll.tick().await;
            sweep.tick().await;

            loop {
                tokio::select! {
                    _ = poll.tick() => {
                        for target in AssistantId::ALL {
                            if self.registry.is_online(target) {
                                self.drain(target).await;
                            }
                        }
                    }
                    _ = sweep.tick() => {
                        match self.store.clear_exhausted().await {
                            Ok(0) => debug!("queue sweep: nothing exhausted"),
                            Ok(swept) => info!(swept, "queue sweep removed exhausted entries"),
                            Err(e) => warn!(error = %e, "queue sweep failed"),
                        }
                    }
                    _ = cancel.cancelled() => {
                        info!("queue processor shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Immediate drain for an assistant that just came online. Invoked from
    /// the transport's session-initialised hook, after the registry update.
    pub async fn on_client_online(&self, target: AssistantId) {
        debug!(target = %target, "client online, draining queue");
        self.drain(target).await;
    }

    /// Deliver every due entry for `target`. Per-entry failures schedule a
    /// retry; they never propagate.
    pub async fn drain(&self, target: AssistantId) {
        let entries = match self.store.dequeue_messages(target, DRAIN_BATCH).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, target = %target, "queue drain query failed");
                return;
            }
        };

        for entry in entries {
            match self.deliver(&entry, target).await {
                Ok(result) => debug!(
                    message_id = entry.message_id.as_str(),
                    result, "queue entry processed"
                ),
                Err(e) => {
                    warn!(
                        error = %e,
                        message_id = entry.message_id.as_str(),
                        "queued delivery failed, scheduling retry"
                    );
                    self.schedule_retry(&entry).await;
                }
            }
        }
    }

    async fn deliver(
        &self,
        entry: &QueueEntry,
        target: AssistantId,
    ) -> Result<&'static str, CrosstalkError> {
        // The referenced message may have been deleted with its conversation.
        if self.store.get_message(&entry.message_id).await?.is_none() {
            self.store.remove_from_queue(&entry.message_id).await?;
            return Ok("removed");
        }

        // The target may have dropped offline since the dequeue.
        if !self.registry.is_online(target) {
            self.schedule_retry(entry).await;
            return Ok("retry");
        }

        self.store
            .update_message_status(&entry.message_id, MessageStatus::Delivered)
            .await?;
        self.store.remove_from_queue(&entry.message_id).await?;
        Ok("delivered")
    }

    async fn schedule_retry(&self, entry: &QueueEntry) {
        let delay = retry_delay_seconds(entry.attempts);
        if let Err(e) = self.store.increment_attempts(entry.id, delay).await {
            warn!(error = %e, entry = entry.id, "failed to schedule retry");
        }
    }
}

/// Backoff schedule: `min(30 * 2^attempts, 3600)` seconds.
pub fn retry_delay_seconds(attempts: i64) -> i64 {
    let shift = attempts.clamp(0, 16) as u32;
    RETRY_BASE_SECONDS
        .saturating_mul(1_i64 << shift)
        .min(RETRY_MAX_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstalk_core::types::{
        Conversation, ConversationStatus, Message, MessageType, Priority,
    };
    use crosstalk_storage::now_ts;
    use tempfile::tempdir;
    use uuid::Uuid;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(retry_delay_seconds(0), 30);
        assert_eq!(retry_delay_seconds(1), 60);
        assert_eq!(retry_delay_seconds(2), 120);
        assert_eq!(retry_delay_seconds(3), 240);
        assert_eq!(retry_delay_seconds(6), 1920);
        assert_eq!(retry_delay_seconds(7), 3600);
        assert_eq!(retry_delay_seconds(40), 3600);
    }

    async fn setup() -> (Store, Arc<ClientRegistry>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("store.sqlite");
        let store = Store::open(db_path.to_str().unwrap()).await.unwrap();
        (store, Arc::new(ClientRegistry::new()), dir)
    }

    async fn seed_queued_message(store: &Store, target: AssistantId) -> String {
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            title: None,
            project: None,
            status: ConversationStatus::Active,
            created_by: target.other(),
            created_at: now_ts(),
            updated_at: now_ts(),
            summary: None,
            metadata: None,
            closed_at: None,
        };
        store.create_conversation(&conversation).await.unwrap();

        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id,
            sender: target.other(),
            target,
            content: "queued".to_string(),
            message_type: MessageType::Message,
            priority: Priority::Normal,
            status: MessageStatus::Pending,
            response_to_id: None,
            created_at: now_ts(),
            delivered_at: None,
            read_at: None,
            metadata: None,
        };
        store.create_message(&message).await.unwrap();
        store
            .enqueue_message(&message.id, target, 0, 5)
            .await
            .unwrap();
        message.id
    }

    #[tokio::test]
    async fn drain_delivers_to_online_target() {
        let (store, registry, _dir) = setup().await;
        let message_id = seed_queued_message(&store, AssistantId::Claude).await;
        registry.set_online(AssistantId::Claude, "sess");

        let processor = QueueProcessor::new(store.clone(), registry);
        processor.drain(AssistantId::Claude).await;

        let message = store.get_message(&message_id).await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Delivered);
        assert!(store.get_queue_entry(&message_id).await.unwrap().is_none());
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn drain_requeues_when_target_drops_offline() {
        let (store, registry, _dir) = setup().await;
        let message_id = seed_queued_message(&store, AssistantId::Claude).await;

        let processor = QueueProcessor::new(store.clone(), registry.clone());
        // Dequeue sees the entry, then the re-check finds claude offline.
        let entries = store
            .dequeue_messages(AssistantId::Claude, 10)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        let result = processor
            .deliver(&entries[0], AssistantId::Claude)
            .await
            .unwrap();
        assert_eq!(result, "retry");

        let entry = store.get_queue_entry(&message_id).await.unwrap().unwrap();
        assert_eq!(entry.attempts, 1);
        let message = store.get_message(&message_id).await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Pending);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn drain_removes_entries_for_vanished_messages() {
        let (store, registry, _dir) = setup().await;
        registry.set_online(AssistantId::Claude, "sess");

        // Fabricate an entry whose message row is gone by deleting the
        // conversation (cascade removes message and queue entry), then
        // re-inserting a dangling-looking entry is impossible under FK; so
        // exercise the path through deliver() directly.
        let message_id = seed_queued_message(&store, AssistantId::Claude).await;
        let entries = store
            .dequeue_messages(AssistantId::Claude, 10)
            .await
            .unwrap();
        let mut entry = entries[0].clone();
        store.remove_from_queue(&message_id).await.unwrap();
        entry.message_id = "no-such-message".to_string();

        let processor = QueueProcessor::new(store.clone(), registry);
        let result = processor
            .deliver(&entry, AssistantId::Claude)
            .await
            .unwrap();
        assert_eq!(result, "removed");
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn on_client_online_drains_immediately() {
        let (store, registry, _dir) = setup().await;
        let message_id = seed_queued_message(&store, AssistantId::Codex).await;
        registry.set_online(AssistantId::Codex, "sess");

        let processor = QueueProcessor::new(store.clone(), registry);
        processor.on_client_online(AssistantId::Codex).await;

        let message = store.get_message(&message_id).await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Delivered);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn background_loop_delivers_within_one_poll() {
        let (store, registry, _dir) = setup().await;
        let message_id = seed_queued_message(&store, AssistantId::Claude).await;
        registry.set_online(AssistantId::Claude, "sess");

        let processor = Arc::new(
            QueueProcessor::new(store.clone(), registry)
                .with_intervals(Duration::from_millis(20), Duration::from_secs(300)),
        );
        let cancel = CancellationToken::new();
        let handle = processor.spawn(cancel.clone());

        // Wait up to one second for the poll loop to pick it up.
        let mut delivered = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let message = store.get_message(&message_id).await.unwrap().unwrap();
            if message.status == MessageStatus::Delivered {
                delivered = true;
                break;
            }
        }
        assert!(delivered, "queue entry should drain within one poll interval");

        cancel.cancel();
        handle.await.unwrap();
        store.close().await.unwrap();
    }
}
