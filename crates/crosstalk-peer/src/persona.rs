// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Personas: static prompt + policy bundles selected per outgoing message.
//!
//! `architect` is the default; `oracle` is chosen when the message content
//! contains one of its trigger keywords.

/// A named prompt and policy bundle for the subprocess peer.
#[derive(Debug, Clone, Copy)]
pub struct Persona {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    /// Passed to the peer as its system prompt unless the config overrides it.
    pub base_instructions: &'static str,
    /// Keywords that auto-select this persona from message content.
    pub triggers: &'static [&'static str],
    /// Overrides the configured sandbox mode for this persona's calls.
    pub sandbox: Option<&'static str>,
}

/// Default persona: design-oriented, answers with concrete proposals.
pub static ARCHITECT: Persona = Persona {
    name: "architect",
    category: "design",
    description: "Structures solutions: API shapes, module boundaries, trade-offs",
    base_instructions: "\
You are a senior software architect collaborating with another AI assistant \
over a message bridge. Answer with concrete designs: name the components, \
their responsibilities, and the interfaces between them. State trade-offs \
briefly and commit to a recommendation instead of listing alternatives. \
When code is the clearest answer, write code.",
    triggers: &[],
    sandbox: None,
};

/// Diagnostic persona: chosen when the message reads like a debugging ask.
pub static ORACLE: Persona = Persona {
    name: "oracle",
    category: "diagnosis",
    description: "Root-causes failures: reads code and evidence before concluding",
    base_instructions: "\
You are a debugging oracle collaborating with another AI assistant over a \
message bridge. Work from evidence: read the relevant code and output before \
forming a hypothesis, state the root cause you believe in and the observation \
that supports it, then give the smallest fix. If the evidence is insufficient, \
say exactly what to check next.",
    triggers: &[
        "why",
        "debug",
        "investigate",
        "root cause",
        "understand",
        "explain",
        "failing",
        "broken",
        "not working",
        "error",
        "bug",
    ],
    sandbox: Some("read-only"),
};

/// Look up a persona by name.
pub fn by_name(name: &str) -> Option<&'static Persona> {
    match name {
        "architect" => Some(&ARCHITECT),
        "oracle" => Some(&ORACLE),
        _ => None,
    }
}

/// Select a persona for an outgoing message.
///
/// An explicitly requested persona wins; otherwise the lowercased content is
/// scanned for oracle triggers, falling back to architect.
pub fn select(explicit: Option<&str>, content: &str) -> &'static Persona {
    if let Some(name) = explicit {
        if let Some(persona) = by_name(name) {
            return persona;
        }
    }
    let lowered = content.to_lowercase();
    if ORACLE.triggers.iter().any(|t| lowered.contains(t)) {
        &ORACLE
    } else {
        &ARCHITECT
    }
}
