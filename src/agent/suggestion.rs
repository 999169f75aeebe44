//! Suggestion schema, alias resolution and best-effort validation
//!
//! Generation output arrives as an arbitrary JSON object. It is first
//! remapped into a [`GeneratedDraft`] (primary keys, then `suggested_`
//! aliases) and then validated into a [`Suggestion`]. Validation never
//! fails: a strict typed pass is attempted first and a lenient coercing
//! pass recovers anything the strict pass rejects.

use crate::agent::context::Constraints;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured SEO suggestion set
///
/// Produced by the pipeline and persisted on agent messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// H1-style page title
    pub page_title: Option<String>,
    /// Page body; empty when the generator produced nothing usable
    #[serde(default)]
    pub page_content: String,
    /// HTML title tag
    pub title_tag: Option<String>,
    /// Meta description
    pub meta_description: Option<String>,
    /// Ordered meta keywords
    #[serde(default)]
    pub meta_keywords: Vec<String>,
}

impl Suggestion {
    /// Returns true when no field carries content
    pub fn is_empty(&self) -> bool {
        self.page_title.is_none()
            && self.page_content.is_empty()
            && self.title_tag.is_none()
            && self.meta_description.is_none()
            && self.meta_keywords.is_empty()
    }
}

/// Which validation path produced a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validation {
    /// Every field already had the expected type
    Strict,
    /// At least one field had to be coerced
    Lenient,
}

/// Suggestion together with the validation path taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    /// The normalized suggestion
    pub suggestion: Suggestion,
    /// Strict or lenient
    pub validation: Validation,
}

/// Raw field values after alias resolution
///
/// Values are kept as untyped JSON; typing happens in [`validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDraft {
    page_title: Value,
    page_content: Value,
    title_tag: Value,
    meta_description: Value,
    meta_keywords: Value,
}

impl GeneratedDraft {
    /// Resolves each field from its primary key, then its `suggested_` alias
    ///
    /// A falsy primary value (null, false, zero, empty string, empty list or
    /// empty object) falls through to the alias. Page content defaults to an
    /// empty string and keywords to an empty list.
    pub fn from_object(raw: &Map<String, Value>) -> Self {
        let resolve = |key: &str| -> Value {
            let alias = format!("suggested_{}", key);
            raw.get(key)
                .filter(|v| is_truthy(v))
                .or_else(|| raw.get(&alias))
                .cloned()
                .unwrap_or(Value::Null)
        };

        let page_content = match resolve("page_content") {
            v if is_truthy(&v) => v,
            _ => Value::String(String::new()),
        };
        let meta_keywords = match resolve("meta_keywords") {
            v if is_truthy(&v) => v,
            _ => Value::Array(Vec::new()),
        };

        Self {
            page_title: resolve("page_title"),
            page_content,
            title_tag: resolve("title_tag"),
            meta_description: resolve("meta_description"),
            meta_keywords,
        }
    }

    /// Like [`GeneratedDraft::from_object`], treating non-objects as empty
    pub fn from_value(raw: &Value) -> Self {
        match raw {
            Value::Object(map) => Self::from_object(map),
            _ => Self::from_object(&Map::new()),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Validates a draft into a suggestion
///
/// Never fails. The worst case is an all-empty suggestion.
pub fn validate(draft: &GeneratedDraft) -> Validated {
    if let Some(suggestion) = strict(draft) {
        return Validated {
            suggestion,
            validation: Validation::Strict,
        };
    }

    tracing::warn!("Generated draft failed strict validation, coercing fields");
    Validated {
        suggestion: lenient(draft),
        validation: Validation::Lenient,
    }
}

fn strict(draft: &GeneratedDraft) -> Option<Suggestion> {
    let text = |v: &Value| -> Option<Option<String>> {
        match v {
            Value::Null => Some(None),
            Value::String(s) => Some(non_empty(s.clone())),
            _ => None,
        }
    };

    let page_content = match &draft.page_content {
        Value::String(s) => s.clone(),
        _ => return None,
    };

    let meta_keywords = match &draft.meta_keywords {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()?,
        _ => return None,
    };

    Some(Suggestion {
        page_title: text(&draft.page_title)?,
        page_content,
        title_tag: text(&draft.title_tag)?,
        meta_description: text(&draft.meta_description)?,
        meta_keywords,
    })
}

fn lenient(draft: &GeneratedDraft) -> Suggestion {
    Suggestion {
        page_title: coerce_text(&draft.page_title),
        page_content: coerce_text(&draft.page_content).unwrap_or_default(),
        title_tag: coerce_text(&draft.title_tag),
        meta_description: coerce_text(&draft.meta_description),
        meta_keywords: coerce_keywords(&draft.meta_keywords),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => non_empty(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => non_empty(other.to_string()),
    }
}

fn coerce_keywords(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                Value::Bool(b) => Some(b.to_string()),
                Value::Number(n) => Some(n.to_string()),
                other => Some(other.to_string()),
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Completeness and length heuristic in `[0, 100]`
///
/// Used for telemetry only.
pub fn score(suggestion: &Suggestion, constraints: &Constraints) -> u8 {
    let mut total: u32 = 0;

    if suggestion.page_title.is_some() {
        total += 15;
    }

    if !suggestion.page_content.is_empty() {
        total += 15;
        if suggestion.page_content.split_whitespace().count() >= 300 {
            total += 10;
        }
    }

    if let Some(tag) = &suggestion.title_tag {
        total += 15;
        if tag.chars().count() <= constraints.title_max {
            total += 5;
        }
    }

    if let Some(meta) = &suggestion.meta_description {
        total += 15;
        let len = meta.chars().count();
        if (constraints.meta_description_min..=constraints.meta_description_max).contains(&len) {
            total += 5;
        }
    }

    let keywords = suggestion.meta_keywords.len();
    if keywords > 0 {
        total += 10;
        if (5..=10).contains(&keywords) {
            total += 10;
        }
    }

    total.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(raw: Value) -> GeneratedDraft {
        GeneratedDraft::from_value(&raw)
    }

    #[test]
    fn test_strict_validation_of_well_formed_output() {
        let result = validate(&draft(json!({
            "page_title": "Best Running Shoes",
            "page_content": "Body",
            "title_tag": "Running Shoes 2024",
            "meta_description": "Find the best shoes.",
            "meta_keywords": ["shoes", "running"]
        })));

        assert_eq!(result.validation, Validation::Strict);
        assert_eq!(result.suggestion.page_title.as_deref(), Some("Best Running Shoes"));
        assert_eq!(result.suggestion.meta_keywords, vec!["shoes", "running"]);
    }

    #[test]
    fn test_aliases_are_used_when_primary_missing() {
        let result = validate(&draft(json!({
            "suggested_page_title": "Alias Title",
            "suggested_meta_keywords": ["a"]
        })));

        assert_eq!(result.suggestion.page_title.as_deref(), Some("Alias Title"));
        assert_eq!(result.suggestion.meta_keywords, vec!["a"]);
    }

    #[test]
    fn test_falsy_primary_falls_through_to_alias() {
        let result = validate(&draft(json!({
            "page_title": "",
            "suggested_page_title": "From Alias",
            "meta_keywords": [],
            "suggested_meta_keywords": ["x", "y"]
        })));

        assert_eq!(result.suggestion.page_title.as_deref(), Some("From Alias"));
        assert_eq!(result.suggestion.meta_keywords, vec!["x", "y"]);
    }

    #[test]
    fn test_malformed_output_yields_defaults() {
        let result = validate(&draft(json!({"unexpected": true})));

        assert_eq!(result.suggestion.page_content, "");
        assert!(result.suggestion.meta_keywords.is_empty());
        assert!(result.suggestion.is_empty());
    }

    #[test]
    fn test_non_object_output_yields_defaults() {
        let result = validate(&draft(json!(["not", "an", "object"])));
        assert!(result.suggestion.is_empty());
    }

    #[test]
    fn test_lenient_coerces_scalars() {
        let result = validate(&draft(json!({
            "page_title": 42,
            "page_content": {"heading": "H"},
            "meta_keywords": ["a", 7, true, null]
        })));

        assert_eq!(result.validation, Validation::Lenient);
        assert_eq!(result.suggestion.page_title.as_deref(), Some("42"));
        assert_eq!(result.suggestion.page_content, r#"{"heading":"H"}"#);
        assert_eq!(result.suggestion.meta_keywords, vec!["a", "7", "true"]);
    }

    #[test]
    fn test_lenient_splits_comma_keywords() {
        let result = validate(&draft(json!({
            "meta_keywords": "seo, content ,, marketing"
        })));

        assert_eq!(result.validation, Validation::Lenient);
        assert_eq!(
            result.suggestion.meta_keywords,
            vec!["seo", "content", "marketing"]
        );
    }

    #[test]
    fn test_lenient_unusable_keywords_become_empty() {
        let result = validate(&draft(json!({"meta_keywords": {"k": 1}})));
        assert!(result.suggestion.meta_keywords.is_empty());
    }

    #[test]
    fn test_empty_alias_text_normalizes_to_none() {
        let result = validate(&draft(json!({
            "title_tag": "",
            "suggested_title_tag": ""
        })));

        assert_eq!(result.validation, Validation::Strict);
        assert_eq!(result.suggestion.title_tag, None);
    }

    #[test]
    fn test_null_page_content_defaults_to_empty_string() {
        let result = validate(&draft(json!({"page_content": null})));
        assert_eq!(result.suggestion.page_content, "");
        assert_eq!(result.validation, Validation::Strict);
    }

    #[test]
    fn test_score_bounds() {
        let constraints = Constraints::default();
        assert_eq!(score(&Suggestion::default(), &constraints), 0);

        let full = Suggestion {
            page_title: Some("Title".into()),
            page_content: "word ".repeat(320),
            title_tag: Some("A short title tag".into()),
            meta_description: Some("m".repeat(155)),
            meta_keywords: vec!["a", "b", "c", "d", "e"]
                .into_iter()
                .map(String::from)
                .collect(),
        };
        assert_eq!(score(&full, &constraints), 100);
    }

    #[test]
    fn test_score_partial() {
        let partial = Suggestion {
            title_tag: Some("t".repeat(90)),
            ..Default::default()
        };
        assert_eq!(score(&partial, &Constraints::default()), 15);
    }
}
