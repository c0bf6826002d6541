// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fire-and-forget knowledge-graph sync.
//!
//! Sync is advisory: every failure (network, non-2xx) is swallowed after a
//! debug log. The `Host` header is pinned to the loopback authority so the
//! graph service's own host filtering accepts us.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// Best-effort REST client for the knowledge-graph service.
pub struct KnowledgeGraphClient {
    base_url: String,
    host: String,
    client: reqwest::Client,
}

impl KnowledgeGraphClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let port = base_url
            .rsplit(':')
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3789);
        Self {
            base_url,
            host: format!("127.0.0.1:{port}"),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Probe the graph service for the `/health` endpoint.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/health", self.base_url);
        match self
            .client
            .get(&url)
            .header(reqwest::header::HOST, &self.host)
            .timeout(Duration::from_millis(1000))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// POST an entity; failures are logged and dropped.
    pub async fn sync_entity(&self, name: &str, entity_type: &str, observations: Vec<String>) {
        let url = format!("{}/api/entity", self.base_url);
        let body = serde_json::json!({
            "name": name,
            "entityType": entity_type,
            "observations": observations,
        });
        match self
            .client
            .post(&url)
            .header(reqwest::header::HOST, &self.host)
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!(name, "knowledge-graph entity synced");
            }
            Ok(response) => {
                debug!(name, status = %response.status(), "knowledge-graph entity sync rejected");
            }
            Err(e) => {
                debug!(name, error = %e, "knowledge-graph entity sync failed");
            }
        }
    }

    /// POST a memory item; failures are logged and dropped.
    pub async fn sync_memory_item(&self, content: &str, tags: Vec<String>) {
        let url = format!("{}/api/memory-items", self.base_url);
        let body = serde_json::json!({
            "content": content,
            "tags": tags,
        });
        match self
            .client
            .post(&url)
            .header(reqwest::header::HOST, &self.host)
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!("knowledge-graph memory item synced");
            }
            Ok(response) => {
                debug!(status = %response.status(), "knowledge-graph memory sync rejected");
            }
            Err(e) => {
                debug!(error = %e, "knowledge-graph memory sync failed");
            }
        }
    }

    /// Detached sync of a closed conversation's summary.
    pub fn spawn_summary_sync(self: &Arc<Self>, conversation_id: &str, summary: &str) {
        let kg = Arc::clone(self);
        let conversation_id = conversation_id.to_string();
        let summary = summary.to_string();
        tokio::spawn(async move {
            kg.sync_entity(
                &format!("conversation:{conversation_id}"),
                "conversation",
                vec![summary.clone()],
            )
            .await;
            kg.sync_memory_item(&summary, vec!["conversation".to_string(), conversation_id])
                .await;
        });
    }

    /// Detached sync of a research or review exchange.
    pub fn spawn_exchange_sync(self: &Arc<Self>, kind: &str, topic: &str, response: &str) {
        let kg = Arc::clone(self);
        let kind = kind.to_string();
        let topic = topic.to_string();
        let response = response.to_string();
        tokio::spawn(async move {
            kg.sync_memory_item(&response, vec![kind, topic]).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_pinned_to_loopback_with_url_port() {
        let kg = KnowledgeGraphClient::new("http://127.0.0.1:4400/");
        assert_eq!(kg.base_url, "http://127.0.0.1:4400");
        assert_eq!(kg.host, "127.0.0.1:4400");
    }

    #[test]
    fn missing_port_falls_back_to_default() {
        let kg = KnowledgeGraphClient::new("http://kg.local");
        assert_eq!(kg.host, "127.0.0.1:3789");
    }

    #[tokio::test]
    async fn unavailable_service_reports_false() {
        // Nothing listens on this port.
        let kg = KnowledgeGraphClient::new("http://127.0.0.1:1");
        assert!(!kg.is_available().await);
    }
}
