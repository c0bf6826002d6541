// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output schemas for structured codex exec responses.
//!
//! The schema file handed to `--output-schema` is selected by the request's
//! message type and written to a throwaway directory for the lifetime of the
//! invocation.

use std::path::PathBuf;

use crosstalk_core::types::MessageType;
use crosstalk_core::CrosstalkError;

/// File name and JSON Schema for the given request type.
pub fn schema_for(message_type: MessageType) -> (&'static str, serde_json::Value) {
    match message_type {
        MessageType::ResearchRequest => ("research-response.json", research_schema()),
        MessageType::ReviewRequest => ("review-response.json", review_schema()),
        _ => ("general-response.json", general_schema()),
    }
}

/// Write the schema for `message_type` into `dir`, returning the file path.
pub fn write_schema_file(
    dir: &std::path::Path,
    message_type: MessageType,
) -> Result<PathBuf, CrosstalkError> {
    let (name, schema) = schema_for(message_type);
    let path = dir.join(name);
    let body = serde_json::to_string_pretty(&schema).map_err(|e| CrosstalkError::Peer {
        message: format!("failed to serialize output schema: {e}"),
        source: Some(Box::new(e)),
    })?;
    std::fs::write(&path, body).map_err(|e| CrosstalkError::Peer {
        message: format!("failed to write output schema {}: {e}", path.display()),
        source: Some(Box::new(e)),
    })?;
    Ok(path)
}

fn general_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "response": {
                "type": "string",
                "description": "The full answer to the message"
            },
            "summary": {
                "type": "string",
                "description": "One-paragraph summary for long responses"
            },
            "references": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Files, URLs, or identifiers the answer relies on"
            }
        },
        "required": ["response"],
        "additionalProperties": false
    })
}

fn research_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string" },
            "findings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "detail": { "type": "string" },
                        "sources": {
                            "type": "array",
                            "items": { "type": "string" }
                        }
                    },
                    "required": ["title", "detail"]
                }
            },
            "recommendations": {
                "type": "array",
                "items": { "type": "string" }
            },
            "concerns": {
                "type": "array",
                "items": { "type": "string" }
            },
            "code_snippets": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "language": { "type": "string" },
                        "code": { "type": "string" },
                        "caption": { "type": "string" }
                    },
                    "required": ["code"]
                }
            }
        },
        "required": ["summary", "findings"],
        "additionalProperties": false
    })
}

fn review_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string" },
            "verdict": {
                "type": "string",
                "enum": ["approve", "request_changes", "comment"]
            },
            "issues": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "severity": { "type": "string" },
                        "description": { "type": "string" },
                        "location": { "type": "string" },
                        "suggestion": { "type": "string" }
                    },
                    "required": ["severity", "description"]
                }
            },
            "strengths": {
                "type": "array",
                "items": { "type": "string" }
            },
            "recommendations": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["summary", "verdict"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_selection_by_message_type() {
        assert_eq!(
            schema_for(MessageType::ResearchRequest).0,
            "research-response.json"
        );
        assert_eq!(
            schema_for(MessageType::ReviewRequest).0,
            "review-response.json"
        );
        assert_eq!(schema_for(MessageType::Message).0, "general-response.json");
        assert_eq!(schema_for(MessageType::System).0, "general-response.json");
    }

    #[test]
    fn review_schema_constrains_verdict() {
        let (_, schema) = schema_for(MessageType::ReviewRequest);
        let verdicts = schema["properties"]["verdict"]["enum"].as_array().unwrap();
        assert_eq!(verdicts.len(), 3);
        assert!(verdicts.iter().any(|v| v == "request_changes"));
    }

    #[test]
    fn write_schema_file_creates_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema_file(dir.path(), MessageType::Message).unwrap();
        assert!(path.ends_with("general-response.json"));
        let body = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["required"][0], "response");
    }
}
