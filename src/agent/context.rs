//! Generation payload assembly
//!
//! Builds the user payload sent alongside the system prompt. Assembly is
//! pure and deterministic: the same inputs always yield the same bytes.

use crate::agent::suggestion::Suggestion;
use serde::{Deserialize, Serialize};

/// Advisory length constraints included in every payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    /// Maximum title tag length (characters)
    #[serde(default = "default_title_max")]
    pub title_max: usize,
    /// Minimum meta description length (characters)
    #[serde(default = "default_meta_description_min")]
    pub meta_description_min: usize,
    /// Maximum meta description length (characters)
    #[serde(default = "default_meta_description_max")]
    pub meta_description_max: usize,
}

fn default_title_max() -> usize {
    60
}

fn default_meta_description_min() -> usize {
    150
}

fn default_meta_description_max() -> usize {
    160
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            title_max: default_title_max(),
            meta_description_min: default_meta_description_min(),
            meta_description_max: default_meta_description_max(),
        }
    }
}

/// Inputs for one payload
#[derive(Debug, Clone)]
pub struct ContextRequest<'a> {
    /// Owning session's title
    pub session_title: &'a str,
    /// Current user instruction
    pub instruction: &'a str,
    /// First user message of the session, on continuation turns
    pub anchor: Option<&'a str>,
    /// Most recent agent suggestion, on continuation turns
    pub current_draft: Option<&'a Suggestion>,
    /// Length constraints
    pub constraints: &'a Constraints,
    /// Pre-formatted knowledge block
    pub retrieved_knowledge: Option<&'a str>,
}

impl<'a> ContextRequest<'a> {
    /// Request for an opening turn
    pub fn opening(
        session_title: &'a str,
        instruction: &'a str,
        constraints: &'a Constraints,
    ) -> Self {
        Self {
            session_title,
            instruction,
            anchor: None,
            current_draft: None,
            constraints,
            retrieved_knowledge: None,
        }
    }

    /// Adds the anchor and draft of a continuation turn
    pub fn with_history(
        mut self,
        anchor: Option<&'a str>,
        current_draft: Option<&'a Suggestion>,
    ) -> Self {
        self.anchor = anchor;
        self.current_draft = current_draft;
        self
    }

    /// Adds a retrieved knowledge block
    pub fn with_knowledge(mut self, knowledge: Option<&'a str>) -> Self {
        self.retrieved_knowledge = knowledge;
        self
    }
}

/// Assembles the payload text
///
/// Sections appear in a fixed order and are joined by a single newline.
/// Sections whose source is absent or empty are omitted; the closing
/// `Return JSON only.` line is always present.
pub fn assemble(request: &ContextRequest<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(knowledge) = request.retrieved_knowledge {
        if !knowledge.trim().is_empty() {
            parts.push(knowledge.to_string());
        }
    }

    if !request.session_title.is_empty() {
        parts.push(format!("Session Title: \"{}\"", request.session_title));
    }

    let c = request.constraints;
    parts.push(format!(
        "Constraints: Title max length: {} chars, Meta description: {}-{} chars",
        c.title_max, c.meta_description_min, c.meta_description_max
    ));

    if let Some(anchor) = request.anchor.map(str::trim).filter(|a| !a.is_empty()) {
        parts.push(format!("Original Request: \"\"\"{}\"\"\"", anchor));
    }

    if let Some(draft) = request.current_draft {
        let lines = draft_lines(draft);
        if !lines.is_empty() {
            parts.push(format!("Current Draft:\n{}", lines.join("\n")));
        }
    }

    let instruction = request.instruction.trim();
    if !instruction.is_empty() {
        parts.push(format!("Current User Instruction: \"\"\"{}\"\"\"", instruction));
    }

    parts.push("Return JSON only.".to_string());

    let payload = parts.join("\n");
    tracing::debug!(bytes = payload.len(), "Assembled generation payload");
    payload
}

fn draft_lines(draft: &Suggestion) -> Vec<String> {
    let mut lines = Vec::new();

    let text_fields = [
        ("page_title", draft.page_title.as_deref()),
        ("page_content", Some(draft.page_content.as_str())),
        ("title_tag", draft.title_tag.as_deref()),
        ("meta_description", draft.meta_description.as_deref()),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            lines.push(format!("{}: {}", key, value));
        }
    }

    if !draft.meta_keywords.is_empty() {
        lines.push(format!("meta_keywords: {}", draft.meta_keywords.join(", ")));
    }

    lines
}
