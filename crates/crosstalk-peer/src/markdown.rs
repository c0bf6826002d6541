// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic Markdown rendering of structured codex outputs.
//!
//! When a structured response parses as JSON it is rendered per request
//! type; unknown shapes fall back to the general renderer.

use crosstalk_core::types::MessageType;

/// Render a parsed structured output as Markdown for the given request type.
pub fn render_structured(message_type: MessageType, value: &serde_json::Value) -> String {
    match message_type {
        MessageType::ReviewRequest => render_review(value),
        MessageType::ResearchRequest => render_research(value),
        _ => render_general(value),
    }
}

fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

fn str_items<'a>(value: &'a serde_json::Value, key: &str) -> Vec<&'a str> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(|item| item.as_str()).collect())
        .unwrap_or_default()
}

fn push_bullets(out: &mut String, heading: &str, items: &[&str]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n### {heading}\n\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}

fn render_review(value: &serde_json::Value) -> String {
    let verdict = str_field(value, "verdict").unwrap_or("comment");
    let mut out = format!("## Review: {}\n", verdict.to_uppercase());

    if let Some(summary) = str_field(value, "summary") {
        out.push_str(&format!("\n{summary}\n"));
    }

    push_bullets(&mut out, "Strengths", &str_items(value, "strengths"));

    if let Some(issues) = value.get("issues").and_then(|v| v.as_array()) {
        if !issues.is_empty() {
            out.push_str("\n### Issues\n\n");
            for issue in issues {
                let severity = str_field(issue, "severity").unwrap_or("info");
                let description = str_field(issue, "description").unwrap_or("(no description)");
                out.push_str(&format!("- **[{severity}]** {description}"));
                if let Some(location) = str_field(issue, "location") {
                    out.push_str(&format!(" ({location})"));
                }
                out.push('\n');
                if let Some(suggestion) = str_field(issue, "suggestion") {
                    out.push_str(&format!("  - Suggestion: {suggestion}\n"));
                }
            }
        }
    }

    push_bullets(&mut out, "Recommendations", &str_items(value, "recommendations"));
    out
}

fn render_research(value: &serde_json::Value) -> String {
    let mut out = String::new();

    if let Some(summary) = str_field(value, "summary") {
        out.push_str(&format!("{summary}\n"));
    }

    if let Some(findings) = value.get("findings").and_then(|v| v.as_array()) {
        for finding in findings {
            let title = str_field(finding, "title").unwrap_or("Finding");
            out.push_str(&format!("\n### {title}\n\n"));
            if let Some(detail) = str_field(finding, "detail") {
                out.push_str(&format!("{detail}\n"));
            }
            let sources = str_items(finding, "sources");
            if !sources.is_empty() {
                for source in sources {
                    out.push_str(&format!("- {source}\n"));
                }
            }
        }
    }

    push_bullets(&mut out, "References", &str_items(value, "references"));
    push_bullets(&mut out, "Concerns", &str_items(value, "concerns"));
    push_bullets(&mut out, "Recommendations", &str_items(value, "recommendations"));

    if let Some(snippets) = value.get("code_snippets").and_then(|v| v.as_array()) {
        if !snippets.is_empty() {
            out.push_str("\n### Code examples\n");
            for snippet in snippets {
                let language = str_field(snippet, "language").unwrap_or("");
                let code = str_field(snippet, "code").unwrap_or("");
                if let Some(caption) = str_field(snippet, "caption") {
                    out.push_str(&format!("\n{caption}\n"));
                }
                out.push_str(&format!("\n```{language}\n{code}\n```\n"));
            }
        }
    }

    out
}

fn render_general(value: &serde_json::Value) -> String {
    let response = str_field(value, "response").unwrap_or_default();
    let mut out = String::new();

    // Long answers get their summary up front.
    if response.len() > 500 {
        if let Some(summary) = str_field(value, "summary") {
            out.push_str(&format!("**Summary:** {summary}\n\n"));
        }
    }
    out.push_str(response);
    out.push('\n');

    push_bullets(&mut out, "References", &str_items(value, "references"));
    out
}
