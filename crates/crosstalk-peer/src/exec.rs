// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot codex exec fallback.
//!
//! Runs `codex exec --json --full-auto --skip-git-repo-check` with an
//! optional `--output-schema`, records an invocation audit row, and parses
//! the child's line-delimited event stream for a final answer. Arguments are
//! always passed in array form; user content never reaches a shell.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use crosstalk_config::model::CodexConfig;
use crosstalk_core::types::{
    AssistantId, Invocation, InvocationStatus, InvocationType, MessageType,
};
use crosstalk_core::CrosstalkError;
use crosstalk_storage::{now_ts, Store};

use crate::markdown::render_structured;
use crate::schema::write_schema_file;

/// Cap on raw stdout returned when no structured answer was found.
const RAW_STDOUT_CAP: usize = 50_000;

/// How much of a command's aggregated output the exploration summary keeps.
const COMMAND_OUTPUT_CAP: usize = 500;

/// One exec request.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub prompt: String,
    pub message_id: String,
    pub message_type: MessageType,
    pub timeout_ms: u64,
    pub use_output_schema: bool,
}

/// What an exec produced: an extracted response (if any) and the child's
/// stderr for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ExecOutcome {
    pub response: Option<String>,
    pub stderr: Option<String>,
}

/// Tier-B executor trait; mocked in dispatcher tests.
#[async_trait]
pub trait PeerExecutor: Send + Sync {
    async fn execute(&self, request: ExecRequest) -> Result<ExecOutcome, CrosstalkError>;
}

/// Spawns one-shot `codex exec` children and audits them in the store.
pub struct CodexExec {
    config: CodexConfig,
    store: Store,
}

impl CodexExec {
    pub fn new(config: CodexConfig, store: Store) -> Self {
        Self { config, store }
    }
}

#[async_trait]
impl PeerExecutor for CodexExec {
    async fn execute(&self, request: ExecRequest) -> Result<ExecOutcome, CrosstalkError> {
        let invocation_id = Uuid::new_v4().to_string();

        // Schema file lives in a throwaway dir for the child's lifetime.
        let schema_dir = tempfile::tempdir().map_err(|e| CrosstalkError::Peer {
            message: format!("failed to create schema dir: {e}"),
            source: Some(Box::new(e)),
        })?;
        let schema_path = if request.use_output_schema {
            Some(write_schema_file(schema_dir.path(), request.message_type)?)
        } else {
            None
        };

        let mut args: Vec<String> = vec![
            "exec".to_string(),
            "--json".to_string(),
            "--full-auto".to_string(),
            "--skip-git-repo-check".to_string(),
        ];
        if let Some(path) = &schema_path {
            args.push("--output-schema".to_string());
            args.push(path.to_string_lossy().into_owned());
        }
        args.push(request.prompt.clone());

        // The stored command is descriptive JSON, never an executable string.
        let command_json = serde_json::json!({
            "program": self.config.path,
            "args": args
                .iter()
                .map(|a| truncate(a, 200))
                .collect::<Vec<_>>(),
        })
        .to_string();

        let invocation = Invocation {
            id: invocation_id.clone(),
            target: AssistantId::Codex,
            message_id: request.message_id.clone(),
            invocation_type: InvocationType::SubprocessExec,
            status: InvocationStatus::Pending,
            command: Some(command_json),
            stdout: None,
            stderr: None,
            exit_code: None,
            created_at: now_ts(),
            started_at: None,
            completed_at: None,
        };
        self.store.create_invocation(&invocation).await?;

        let mut cmd = Command::new(&self.config.path);
        cmd.args(&args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.store
                    .finalize_invocation(
                        &invocation_id,
                        InvocationStatus::Failed,
                        None,
                        Some(format!("spawn failed: {e}")),
                        None,
                    )
                    .await?;
                return Err(CrosstalkError::Peer {
                    message: format!("failed to spawn {}: {e}", self.config.path),
                    source: Some(Box::new(e)),
                });
            }
        };
        self.store.mark_invocation_running(&invocation_id).await?;

        let deadline = Duration::from_millis(request.timeout_ms);
        let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                self.store
                    .finalize_invocation(
                        &invocation_id,
                        InvocationStatus::Failed,
                        None,
                        Some(format!("wait failed: {e}")),
                        None,
                    )
                    .await?;
                return Err(CrosstalkError::Peer {
                    message: format!("codex exec wait failed: {e}"),
                    source: Some(Box::new(e)),
                });
            }
            Err(_) => {
                // The dropped future kills the child (kill_on_drop).
                warn!(
                    invocation_id = invocation_id.as_str(),
                    timeout_ms = request.timeout_ms,
                    "codex exec timed out"
                );
                self.store
                    .finalize_invocation(
                        &invocation_id,
                        InvocationStatus::Timeout,
                        None,
                        Some(format!("timed out after {} ms", request.timeout_ms)),
                        None,
                    )
                    .await?;
                return Ok(ExecOutcome {
                    response: None,
                    stderr: Some(format!("timed out after {} ms", request.timeout_ms)),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let exit_code = output.status.code().map(i64::from);
        let status = if output.status.success() {
            InvocationStatus::Completed
        } else {
            InvocationStatus::Failed
        };

        self.store
            .finalize_invocation(
                &invocation_id,
                status,
                Some(truncate(&stdout, RAW_STDOUT_CAP).into_owned()),
                Some(truncate(&stderr, RAW_STDOUT_CAP).into_owned()),
                exit_code,
            )
            .await?;

        let response = extract_response(&stdout, request.message_type);
        debug!(
            invocation_id = invocation_id.as_str(),
            extracted = response.is_some(),
            exit = ?exit_code,
            "codex exec finished"
        );

        Ok(ExecOutcome {
            response,
            stderr: (!stderr.is_empty()).then_some(stderr),
        })
    }
}

/// Truncate at a char boundary at or below `max` bytes.
fn truncate(s: &str, max: usize) -> std::borrow::Cow<'_, str> {
    if s.len() <= max {
        return std::borrow::Cow::Borrowed(s);
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    std::borrow::Cow::Borrowed(&s[..end])
}

/// Walk the child's line-delimited event stream and pull out a final answer.
///
/// Priority order: completed-turn output text (rendered as Markdown when it
/// parses as JSON), then the last agent message, then the legacy assistant
/// message shape, then a synthesised exploration summary, then raw stdout.
pub fn extract_response(stdout: &str, message_type: MessageType) -> Option<String> {
    let mut output_text: Option<String> = None;
    let mut agent_message: Option<String> = None;
    let mut legacy_message: Option<String> = None;
    let mut reasoning: Vec<String> = Vec::new();
    let mut commands: Vec<serde_json::Value> = Vec::new();

    for line in stdout.lines() {
        let Ok(event) = serde_json::from_str::<serde_json::Value>(line.trim()) else {
            continue;
        };
        let event_type = event.get("type").and_then(|t| t.as_str()).unwrap_or("");

        match event_type {
            "response.completed" => {
                if let Some(text) = event
                    .get("response")
                    .and_then(|r| r.get("output_text"))
                    .and_then(|t| t.as_str())
                {
                    output_text = Some(text.to_string());
                }
            }
            "turn.completed" => {
                if let Some(text) = event.get("output_text").and_then(|t| t.as_str()) {
                    output_text = Some(text.to_string());
                }
            }
            "item.completed" => {
                let Some(item) = event.get("item") else { continue };
                match item.get("type").and_then(|t| t.as_str()) {
                    Some("agent_message") => {
                        if let Some(text) = item.get("text").and_then(|t| t.as_str()) {
                            if !text.trim().is_empty() {
                                agent_message = Some(text.to_string());
                            }
                        }
                    }
                    Some("reasoning") => {
                        if let Some(text) = item.get("text").and_then(|t| t.as_str()) {
                            reasoning.push(text.to_string());
                        }
                    }
                    Some("command_execution") => {
                        commands.push(item.clone());
                    }
                    _ => {}
                }
            }
            "message" => {
                if event.get("role").and_then(|r| r.as_str()) == Some("assistant") {
                    match event.get("content") {
                        Some(serde_json::Value::String(content)) => {
                            legacy_message = Some(content.clone());
                        }
                        Some(serde_json::Value::Array(parts)) => {
                            let joined: String = parts
                                .iter()
                                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                                .collect::<Vec<_>>()
                                .join("\n");
                            if !joined.is_empty() {
                                legacy_message = Some(joined);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(text) = output_text {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) {
            if parsed.is_object() {
                return Some(render_structured(message_type, &parsed));
            }
        }
        return Some(text);
    }
    if let Some(text) = agent_message {
        return Some(text);
    }
    if let Some(text) = legacy_message {
        return Some(text);
    }
    if !reasoning.is_empty() || !commands.is_empty() {
        return Some(exploration_summary(&reasoning, &commands));
    }
    if !stdout.trim().is_empty() {
        let mut raw = truncate(stdout, RAW_STDOUT_CAP).into_owned();
        if stdout.len() > RAW_STDOUT_CAP {
            raw.push_str("\n[output truncated]");
        }
        return Some(raw);
    }
    None
}

/// Synthesise a summary from exploration events when no final answer exists.
fn exploration_summary(reasoning: &[String], commands: &[serde_json::Value]) -> String {
    let mut out = String::from("[exploration - no final answer]\n");

    for thought in reasoning.iter().rev().take(2).rev() {
        out.push_str(&format!("\n{thought}\n"));
    }

    let start = commands.len().saturating_sub(3);
    for command in &commands[start..] {
        let cmd = command
            .get("command")
            .and_then(|c| c.as_str())
            .unwrap_or("(unknown command)");
        let output = command
            .get("aggregated_output")
            .and_then(|o| o.as_str())
            .unwrap_or("");
        let exit = command.get("exit_code").and_then(|e| e.as_i64()).unwrap_or(0);

        out.push_str(&format!("\n$ {cmd}\n"));
        out.push_str(&truncate(output, COMMAND_OUTPUT_CAP));
        if output.len() > COMMAND_OUTPUT_CAP {
            out.push_str("[...]");
        }
        if exit != 0 {
            out.push_str(&format!(" (exit: {exit})"));
        }
        out.push('\n');
    }

    out
}
