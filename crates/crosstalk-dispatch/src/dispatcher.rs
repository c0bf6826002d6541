// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The core decision procedure for sending a message across the bridge.
//!
//! Routing: an online target gets the message marked delivered (targets poll
//! for their messages; nothing is pushed). An offline codex triggers the
//! tiered subprocess invocation. An offline claude gets a durable queue
//! entry. Response correlation is a condition on the store
//! (`get_response_to_message`) polled with adaptive backoff.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use strum::Display;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crosstalk_core::types::{
    AssistantId, Conversation, ConversationStatus, Message, MessageStatus, MessageType, Priority,
};
use crosstalk_core::{ClientRegistry, CrosstalkError};
use crosstalk_peer::{persona, ExecRequest, PeerChannel, PeerExecutor};
use crosstalk_storage::{now_ts, Store};

/// Queue entries give up after this many delivery attempts.
const QUEUE_MAX_ATTEMPTS: i64 = 5;

/// How much conversation history is replayed to the subprocess peer.
const CONTEXT_WINDOW: usize = 20;

/// Default hard deadline for a tier-B exec when the caller set none.
const DEFAULT_EXEC_TIMEOUT_MS: u64 = 300_000;

/// Options for one send.
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub conversation_id: Option<String>,
    pub message_type: MessageType,
    pub priority: Priority,
    /// Marks the created message as the answer to an earlier one.
    pub response_to_id: Option<String>,
    pub wait_for_response: bool,
    pub timeout_ms: u64,
    /// Explicit persona name; auto-selected from content when absent.
    pub agent: Option<String>,
    pub metadata: Option<String>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            conversation_id: None,
            message_type: MessageType::Message,
            priority: Priority::Normal,
            response_to_id: None,
            wait_for_response: true,
            timeout_ms: 60_000,
            agent: None,
            metadata: None,
        }
    }
}

/// Where a message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Target is online and will pick the message up on its next poll.
    Delivered,
    /// Target is offline; a queue entry will retry delivery.
    Queued,
    /// A response message exists already.
    Responded,
    /// Nothing could deliver or answer it; the message stays pending.
    Pending,
}

/// Result of one send.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub message_id: String,
    pub conversation_id: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Message>,
    /// True when the persistent MCP channel produced the response.
    #[serde(rename = "invokedViaMcp")]
    pub invoked_via_mcp: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_error: Option<String>,
}

/// Routes messages between the assistants. Shared and stateless modulo the
/// peer adapters it holds.
pub struct Dispatcher {
    store: Store,
    registry: Arc<ClientRegistry>,
    peer: Arc<dyn PeerChannel>,
    exec: Arc<dyn PeerExecutor>,
    /// Gates the persistent MCP tier; the exec tier always remains.
    peer_mcp_enabled: bool,
}

impl Dispatcher {
    pub fn new(
        store: Store,
        registry: Arc<ClientRegistry>,
        peer: Arc<dyn PeerChannel>,
        exec: Arc<dyn PeerExecutor>,
        peer_mcp_enabled: bool,
    ) -> Self {
        Self {
            store,
            registry,
            peer,
            exec,
            peer_mcp_enabled,
        }
    }

    /// Send `content` from `sender` to `target` and route it.
    pub async fn send_message(
        &self,
        sender: AssistantId,
        target: AssistantId,
        content: &str,
        opts: SendOptions,
    ) -> Result<DispatchOutcome, CrosstalkError> {
        if sender == target {
            return Err(CrosstalkError::Validation(
                "cannot send a message to yourself".to_string(),
            ));
        }

        // 1. Conversation resolution.
        let conversation = match &opts.conversation_id {
            Some(id) => self
                .store
                .get_conversation(id)
                .await?
                .ok_or_else(|| CrosstalkError::not_found("conversation", id.as_str()))?,
            None => {
                let conversation = Conversation {
                    id: Uuid::new_v4().to_string(),
                    title: None,
                    project: None,
                    status: ConversationStatus::Active,
                    created_by: sender,
                    created_at: now_ts(),
                    updated_at: now_ts(),
                    summary: None,
                    metadata: None,
                    closed_at: None,
                };
                self.store.create_conversation(&conversation).await?;
                conversation
            }
        };

        // 2. Message creation.
        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            sender,
            target,
            content: content.to_string(),
            message_type: opts.message_type,
            priority: opts.priority,
            status: MessageStatus::Pending,
            response_to_id: opts.response_to_id.clone(),
            created_at: now_ts(),
            delivered_at: None,
            read_at: None,
            metadata: opts.metadata.clone(),
        };
        self.store.create_message(&message).await?;

        // Answering an earlier message resolves it.
        if let Some(request_id) = &opts.response_to_id {
            self.store
                .update_message_status(request_id, MessageStatus::Responded)
                .await?;
        }

        // 3. Routing decision.
        let mut outcome = if self.registry.is_online(target) {
            self.store
                .update_message_status(&message.id, MessageStatus::Delivered)
                .await?;
            debug!(
                message_id = message.id.as_str(),
                target = %target,
                "target online, message delivered"
            );
            DispatchOutcome {
                message_id: message.id.clone(),
                conversation_id: conversation.id.clone(),
                status: DeliveryStatus::Delivered,
                response: None,
                invoked_via_mcp: false,
                invocation_error: None,
            }
        } else if target == AssistantId::Codex {
            self.invoke_codex(&conversation, &message, &opts).await?
        } else {
            self.store
                .enqueue_message(
                    &message.id,
                    target,
                    opts.priority.queue_weight(),
                    QUEUE_MAX_ATTEMPTS,
                )
                .await?;
            info!(
                message_id = message.id.as_str(),
                priority = opts.priority.queue_weight(),
                "claude offline, message queued"
            );
            DispatchOutcome {
                message_id: message.id.clone(),
                conversation_id: conversation.id.clone(),
                status: DeliveryStatus::Queued,
                response: None,
                invoked_via_mcp: false,
                invocation_error: None,
            }
        };

        // 5. Wait for a response when asked and none was produced inline.
        if opts.wait_for_response && outcome.response.is_none() {
            if let Some(response) = self
                .wait_for_response(&message.id, opts.timeout_ms)
                .await?
            {
                outcome.status = DeliveryStatus::Responded;
                outcome.response = Some(response);
            }
        }

        Ok(outcome)
    }

    /// Tiered invocation for an offline codex: persistent MCP channel first,
    /// one-shot exec as the fallback.
    async fn invoke_codex(
        &self,
        conversation: &Conversation,
        message: &Message,
        opts: &SendOptions,
    ) -> Result<DispatchOutcome, CrosstalkError> {
        let persona = persona::select(opts.agent.as_deref(), &message.content);
        let prompt = self.build_prompt(conversation, message).await?;
        debug!(
            message_id = message.id.as_str(),
            persona = persona.name,
            "invoking offline codex"
        );

        // Tier A: persistent MCP channel.
        if self.peer_mcp_enabled {
            match self
                .peer
                .send_message(&prompt, Some(&message.id), Some(persona))
                .await
            {
                Ok(Some(text)) => {
                    let response = self.record_response(message, text).await?;
                    return Ok(DispatchOutcome {
                        message_id: message.id.clone(),
                        conversation_id: conversation.id.clone(),
                        status: DeliveryStatus::Responded,
                        response: Some(response),
                        invoked_via_mcp: true,
                        invocation_error: None,
                    });
                }
                Ok(None) => {
                    debug!(message_id = message.id.as_str(), "peer channel produced no text");
                }
                Err(e) => {
                    warn!(error = %e, "persistent peer channel failed, falling back to exec");
                }
            }
        }

        // Tier B: one-shot exec with structured output.
        let request = ExecRequest {
            prompt,
            message_id: message.id.clone(),
            message_type: message.message_type,
            timeout_ms: if opts.timeout_ms > 0 {
                opts.timeout_ms
            } else {
                DEFAULT_EXEC_TIMEOUT_MS
            },
            use_output_schema: true,
        };
        match self.exec.execute(request).await {
            Ok(outcome) => match outcome.response {
                Some(text) => {
                    let response = self.record_response(message, text).await?;
                    Ok(DispatchOutcome {
                        message_id: message.id.clone(),
                        conversation_id: conversation.id.clone(),
                        status: DeliveryStatus::Responded,
                        response: Some(response),
                        invoked_via_mcp: false,
                        invocation_error: None,
                    })
                }
                None => Ok(DispatchOutcome {
                    message_id: message.id.clone(),
                    conversation_id: conversation.id.clone(),
                    status: DeliveryStatus::Pending,
                    response: None,
                    invoked_via_mcp: false,
                    invocation_error: Some(
                        outcome
                            .stderr
                            .unwrap_or_else(|| "Invocation failed with no output".to_string()),
                    ),
                }),
            },
            Err(e) => Ok(DispatchOutcome {
                message_id: message.id.clone(),
                conversation_id: conversation.id.clone(),
                status: DeliveryStatus::Pending,
                response: None,
                invoked_via_mcp: false,
                invocation_error: Some(e.to_string()),
            }),
        }
    }

    /// Render recent conversation history ahead of the new message.
    async fn build_prompt(
        &self,
        conversation: &Conversation,
        message: &Message,
    ) -> Result<String, CrosstalkError> {
        let history = self.store.get_history(&conversation.id, 1000, 0).await?;
        let context: Vec<String> = history
            .iter()
            .filter(|m| m.id != message.id)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .take(CONTEXT_WINDOW)
            .rev()
            .map(|m| format!("[{}]: {}", m.sender, m.content))
            .collect();

        if context.is_empty() {
            Ok(message.content.clone())
        } else {
            Ok(format!(
                "{}\n\nNew message:\n{}",
                context.join("\n\n"),
                message.content
            ))
        }
    }

    /// Store the peer's answer as a response message and resolve the request.
    async fn record_response(
        &self,
        request: &Message,
        text: String,
    ) -> Result<Message, CrosstalkError> {
        let response = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: request.conversation_id.clone(),
            sender: request.target,
            target: request.sender,
            content: text,
            message_type: request.message_type.response_type(),
            priority: request.priority,
            status: MessageStatus::Pending,
            response_to_id: Some(request.id.clone()),
            created_at: now_ts(),
            delivered_at: None,
            read_at: None,
            metadata: None,
        };
        self.store.create_message(&response).await?;
        self.store
            .update_message_status(&request.id, MessageStatus::Responded)
            .await?;
        Ok(response)
    }

    /// Poll for the response to `message_id` with adaptive backoff: 100 ms
    /// growing by 1.5x up to 1 s, until `timeout_ms` has elapsed.
    pub async fn wait_for_response(
        &self,
        message_id: &str,
        timeout_ms: u64,
    ) -> Result<Option<Message>, CrosstalkError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut delay = Duration::from_millis(100);

        loop {
            if let Some(response) = self.store.get_response_to_message(message_id).await? {
                return Ok(Some(response));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(delay.min(deadline - now)).await;
            delay = Duration::from_millis(((delay.as_millis() as u64 * 3) / 2).min(1000));
        }
    }

    /// The store this dispatcher routes through.
    pub fn store(&self) -> &Store {
        &self.store
    }
}
