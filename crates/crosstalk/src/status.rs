// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `crosstalk status` command implementation.
//!
//! Queries a running bridge's `/status` endpoint and prints a summary.

use crosstalk_config::CrosstalkConfig;
use crosstalk_core::CrosstalkError;

pub async fn run_status(config: &CrosstalkConfig) -> Result<(), CrosstalkError> {
    let url = format!("http://127.0.0.1:{}/status", config.server.port);
    let response = reqwest::Client::new()
        .get(&url)
        .timeout(std::time::Duration::from_secs(2))
        .send()
        .await
        .map_err(|e| CrosstalkError::Transport {
            message: format!("bridge not reachable on port {}: {e}", config.server.port),
            source: Some(Box::new(e)),
        })?;

    let status: serde_json::Value =
        response.json().await.map_err(|e| CrosstalkError::Transport {
            message: format!("malformed status response: {e}"),
            source: Some(Box::new(e)),
        })?;

    let count = status["sessionCount"].as_u64().unwrap_or(0);
    println!("sessions: {count}");
    if let Some(sessions) = status["sessions"].as_array() {
        for session in sessions {
            let id = session["id"].as_str().unwrap_or("?");
            let client = session["clientId"].as_str().unwrap_or("-");
            println!("  {id}  {client}");
        }
    }
    Ok(())
}
