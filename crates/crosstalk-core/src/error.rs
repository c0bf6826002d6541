// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Crosstalk bridge.

use thiserror::Error;

/// The primary error type used across all Crosstalk crates.
///
/// Tool handlers serialise these into the `{"error": …}` envelope; the
/// transport maps session-level failures onto JSON-RPC error responses.
#[derive(Debug, Error)]
pub enum CrosstalkError {
    /// Configuration errors (invalid TOML, bad env override, missing field).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, constraint).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport/session errors (bind failure, broken stream).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Subprocess peer errors (spawn, stdio channel, tool call).
    #[error("peer error: {message}")]
    Peer {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A named entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Tool input failed schema validation.
    #[error("{0}")]
    Validation(String),

    /// The session has no resolved assistant identity.
    #[error("Unknown client")]
    UnknownClient,

    /// The caller is not allowed to perform this transition.
    #[error("{0}")]
    Forbidden(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CrosstalkError {
    /// Shorthand for a [`CrosstalkError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}
