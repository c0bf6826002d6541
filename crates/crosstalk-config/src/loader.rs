// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order (later overrides earlier): compiled defaults, the XDG user
//! config (`~/.config/crosstalk/crosstalk.toml`), a local `crosstalk.toml`,
//! then the flat environment variables from the bridge's original
//! deployment contract (`PORT`, `DB_PATH`, `KG_URL`, `CODEX_*`).

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CrosstalkConfig;

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<CrosstalkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrosstalkConfig::default()))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("crosstalk/crosstalk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("crosstalk.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CrosstalkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrosstalkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Environment provider mapping the bridge's flat variable names onto the
/// nested config structure.
///
/// These names are a compatibility contract (`PORT`, `DB_PATH`, ...), so the
/// mapping is explicit per key rather than prefix-and-split.
fn env_provider() -> Env {
    Env::raw()
        .only(&[
            "PORT",
            "DB_PATH",
            "KG_URL",
            "CODEX_MCP_ENABLED",
            "CODEX_PATH",
            "CODEX_SANDBOX",
            "CODEX_APPROVAL_POLICY",
            "CODEX_BASE_INSTRUCTIONS",
        ])
        .map(|key| {
            let lowered = key.as_str().to_ascii_lowercase();
            let mapped = match lowered.as_str() {
                "port" => "server.port".to_string(),
                "db_path" => "storage.database_path".to_string(),
                "kg_url" => "knowledge_graph.url".to_string(),
                "codex_mcp_enabled" => "codex.enabled".to_string(),
                "codex_path" => "codex.path".to_string(),
                "codex_sandbox" => "codex.sandbox".to_string(),
                "codex_approval_policy" => "codex.approval_policy".to_string(),
                "codex_base_instructions" => "codex.base_instructions".to_string(),
                _ => lowered,
            };
            mapped.into()
        })
}
