// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Crosstalk configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrosstalkConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Knowledge-graph sync settings.
    #[serde(default)]
    pub knowledge_graph: KnowledgeGraphConfig,

    /// Codex subprocess peer settings.
    #[serde(default)]
    pub codex: CodexConfig,
}

/// HTTP server configuration. The bridge only ever binds loopback.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Port to bind on 127.0.0.1.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    3790
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::home_dir()
        .map(|home| home.join(".local-data/store.sqlite"))
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".local-data/store.sqlite".to_string())
}

/// Knowledge-graph sync configuration. Sync is advisory and best-effort.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeGraphConfig {
    /// Base URL of the knowledge-graph service.
    #[serde(default = "default_kg_url")]
    pub url: String,
}

impl Default for KnowledgeGraphConfig {
    fn default() -> Self {
        Self {
            url: default_kg_url(),
        }
    }
}

fn default_kg_url() -> String {
    "http://127.0.0.1:3789".to_string()
}

/// Codex subprocess peer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CodexConfig {
    /// Whether the persistent MCP stdio channel to codex is attempted at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Binary path or name of the codex CLI.
    #[serde(default = "default_codex_path")]
    pub path: String,

    /// Sandbox mode passed to codex calls.
    #[serde(default = "default_sandbox")]
    pub sandbox: String,

    /// Approval policy passed to codex calls.
    #[serde(default = "default_approval_policy")]
    pub approval_policy: String,

    /// Override for persona base instructions. `None` uses the persona's own.
    #[serde(default)]
    pub base_instructions: Option<String>,

    /// Working directory for spawned codex processes. `None` inherits.
    #[serde(default)]
    pub working_dir: Option<String>,
}

impl Default for CodexConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_codex_path(),
            sandbox: default_sandbox(),
            approval_policy: default_approval_policy(),
            base_instructions: None,
            working_dir: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_codex_path() -> String {
    "codex".to_string()
}

fn default_sandbox() -> String {
    "workspace-read".to_string()
}

fn default_approval_policy() -> String {
    "never".to_string()
}
