// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types shared across the bridge.
//!
//! These types mirror the rows stored in the SQLite database. Timestamps are
//! fixed-width ISO 8601 UTC strings (`2026-01-01T00:00:00.000Z`) so that
//! lexicographic ordering matches chronological ordering.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One of the two assistants this bridge connects. Two is a hard assumption.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssistantId {
    Claude,
    Codex,
}

impl AssistantId {
    /// Both assistants, in seed order.
    pub const ALL: [AssistantId; 2] = [AssistantId::Claude, AssistantId::Codex];

    /// The opposite end of the bridge.
    pub fn other(self) -> Self {
        match self {
            AssistantId::Claude => AssistantId::Codex,
            AssistantId::Codex => AssistantId::Claude,
        }
    }

    /// Human-readable description returned by `who_am_i`.
    pub fn description(self) -> &'static str {
        match self {
            AssistantId::Claude => "Claude Code CLI",
            AssistantId::Codex => "Codex CLI",
        }
    }
}

/// Persisted client status. A hint only -- the in-memory registry is
/// authoritative for "online".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Online,
    Offline,
    Busy,
}

/// Conversation lifecycle state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Pending,
    Completed,
    Archived,
}

/// Kind of a directed message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Message,
    ResearchRequest,
    ResearchResponse,
    ReviewRequest,
    ReviewResponse,
    ContextShare,
    System,
}

impl MessageType {
    /// The response type paired with a request type. Plain messages answer
    /// with plain messages.
    pub fn response_type(self) -> MessageType {
        match self {
            MessageType::ResearchRequest => MessageType::ResearchResponse,
            MessageType::ReviewRequest => MessageType::ReviewResponse,
            _ => MessageType::Message,
        }
    }
}

/// Delivery priority. Ordered for queue ranking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Integer weight stored in queue rows: urgent=2, high=1, normal=0.
    pub fn queue_weight(self) -> i64 {
        match self {
            Priority::Normal => 0,
            Priority::High => 1,
            Priority::Urgent => 2,
        }
    }
}

/// Message delivery state. Transitions are monotonic along
/// pending -> delivered -> read -> responded, with responded reachable
/// directly from any earlier state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Delivered,
    Read,
    Responded,
}

impl MessageStatus {
    /// Position along the monotonic transition chain.
    pub fn rank(self) -> u8 {
        match self {
            MessageStatus::Pending => 0,
            MessageStatus::Delivered => 1,
            MessageStatus::Read => 2,
            MessageStatus::Responded => 3,
        }
    }
}

/// How a subprocess peer call was made.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvocationType {
    SubprocessExec,
    PeerMcp,
}

/// Lifecycle of a subprocess peer call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Timeout,
}

/// Kind of a shared context payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    File,
    Snippet,
    Entity,
    MemoryItem,
    Url,
}

/// A pre-seeded client row, one per assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: AssistantId,
    pub display_name: String,
    pub status: ClientStatus,
    /// Session id mirror from the registry; stale after a crash.
    pub session_id: Option<String>,
    pub last_seen_at: Option<String>,
    pub created_at: String,
}

/// A correlation bucket for messages between the two assistants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: Option<String>,
    pub project: Option<String>,
    pub status: ConversationStatus,
    pub created_by: AssistantId,
    pub created_at: String,
    pub updated_at: String,
    pub summary: Option<String>,
    /// Opaque JSON metadata blob.
    pub metadata: Option<String>,
    pub closed_at: Option<String>,
}

/// One directed communication from `sender` to `target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender: AssistantId,
    pub target: AssistantId,
    pub content: String,
    pub message_type: MessageType,
    pub priority: Priority,
    pub status: MessageStatus,
    /// Set on `*_response` messages: the request being answered.
    pub response_to_id: Option<String>,
    pub created_at: String,
    pub delivered_at: Option<String>,
    pub read_at: Option<String>,
    /// Opaque JSON metadata blob.
    pub metadata: Option<String>,
}

/// A pending delivery attempt for an offline target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Auto-increment queue entry id.
    pub id: i64,
    pub message_id: String,
    pub target: AssistantId,
    /// Integer priority: urgent=2, high=1, normal=0.
    pub priority: i64,
    pub attempts: i64,
    pub max_attempts: i64,
    /// Earliest timestamp at which the next delivery attempt is due.
    pub next_attempt: String,
    pub created_at: String,
}

/// Audit record for one subprocess peer call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    pub id: String,
    pub target: AssistantId,
    pub message_id: String,
    pub invocation_type: InvocationType,
    pub status: InvocationStatus,
    /// Descriptive JSON of the spawned command, never an executable string.
    pub command: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: Option<i64>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

/// An opaque context payload shared between the assistants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedContext {
    pub id: String,
    pub conversation_id: Option<String>,
    pub context_type: ContextType,
    pub content: String,
    pub description: Option<String>,
    pub shared_by: AssistantId,
    pub created_at: String,
}

/// A full-text search hit over message content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSearchHit {
    pub message_id: String,
    pub conversation_id: String,
    pub sender: AssistantId,
    pub snippet: String,
    pub created_at: String,
}
