// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local registry of which assistant currently holds a live session.
//!
//! The registry is the single source of truth for "is the peer reachable
//! right now". The `clients.status` column in the store is a stale mirror
//! updated on the same transitions for persistence and debugging.

use dashmap::DashMap;

use crate::types::AssistantId;

/// Authoritative map of assistant id to live session id.
///
/// All operations are O(1) and safe under concurrent readers with a single
/// concurrent writer per key. A session initialising for an assistant that
/// is already registered silently replaces the mapping; the old transport
/// closes on its own.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    sessions: DashMap<AssistantId, String>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` as online under `session_id`, replacing any prior mapping.
    pub fn set_online(&self, id: AssistantId, session_id: impl Into<String>) {
        self.sessions.insert(id, session_id.into());
    }

    /// Remove `id` from the online set.
    pub fn set_offline(&self, id: AssistantId) {
        self.sessions.remove(&id);
    }

    pub fn is_online(&self, id: AssistantId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// The live session id for `id`, if any.
    pub fn get_session_id(&self, id: AssistantId) -> Option<String> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// All currently-online assistants.
    pub fn online_list(&self) -> Vec<AssistantId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    /// Drop every mapping. Used by the shutdown hook.
    pub fn clear(&self) {
        self.sessions.clear();
    }
}
