// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared dependencies handed to every tool invocation.

use std::sync::Arc;

use crosstalk_core::types::AssistantId;
use crosstalk_core::{ClientRegistry, CrosstalkError};
use crosstalk_dispatch::Dispatcher;
use crosstalk_storage::Store;

use crate::kg::KnowledgeGraphClient;

/// Everything a tool handler may need: the store, the client registry, the
/// dispatcher, the knowledge-graph client, and the calling session's
/// identity (if one was resolved).
#[derive(Clone)]
pub struct ToolContext {
    pub store: Store,
    pub clients: Arc<ClientRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub kg: Arc<KnowledgeGraphClient>,
    pub identity: Option<AssistantId>,
}

impl ToolContext {
    /// The calling assistant, or the canonical `Unknown client` failure.
    pub fn require_identity(&self) -> Result<AssistantId, CrosstalkError> {
        self.identity.ok_or(CrosstalkError::UnknownClient)
    }

    /// A copy of this context bound to a session identity.
    pub fn with_identity(&self, identity: Option<AssistantId>) -> Self {
        Self {
            identity,
            ..self.clone()
        }
    }
}
