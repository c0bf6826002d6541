// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session state.
//!
//! Each session exclusively owns its event log; the process-wide map is
//! mutated only from initialise (insert) and close (delete), and iterated
//! only at shutdown. Every map mutation is paired with the corresponding
//! ClientRegistry update so the two cannot diverge.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crosstalk_core::types::AssistantId;
use crosstalk_tools::ToolServer;

use crate::event_log::EventLog;

/// An event as it travels to a live stream subscriber.
#[derive(Debug, Clone)]
pub struct StreamEvent {
    pub event_id: String,
    pub payload: serde_json::Value,
}

/// One live tool-call session.
pub struct Session {
    pub id: String,
    pub assistant_id: Option<AssistantId>,
    pub tool_server: ToolServer,
    pub event_log: EventLog,
    events_tx: broadcast::Sender<StreamEvent>,
}

impl Session {
    pub fn new(id: String, assistant_id: Option<AssistantId>, tool_server: ToolServer) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            id,
            assistant_id,
            tool_server,
            event_log: EventLog::default(),
            events_tx,
        }
    }

    /// Buffer `payload` in the event log and fan it out to any live stream.
    ///
    /// Returns the assigned event id.
    pub fn emit(&self, payload: serde_json::Value) -> String {
        let event_id = self.event_log.store(&self.id, payload.clone());
        let _ = self.events_tx.send(StreamEvent {
            event_id: event_id.clone(),
            payload,
        });
        event_id
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events_tx.subscribe()
    }
}

/// The process-wide session map.
pub type SessionMap = Arc<DashMap<String, Arc<Session>>>;
