//! SEO guideline retrieval
//!
//! Supplies a short block of relevant best-practice guidance that is placed
//! ahead of the generation payload. Retrieval never fails: a miss yields an
//! empty string.

use async_trait::async_trait;
use std::collections::HashSet;

/// Source of guidance text for a query
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// Returns a formatted knowledge block for `query`, or an empty string
    ///
    /// `hint` (typically the session title) is prepended to the query.
    async fn retrieve(&self, query: &str, hint: Option<&str>) -> String;
}

/// Retriever that never returns guidance
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKnowledge;

#[async_trait]
impl KnowledgeRetriever for NoKnowledge {
    async fn retrieve(&self, _query: &str, _hint: Option<&str>) -> String {
        String::new()
    }
}

/// Relative weight of a guideline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Importance {
    /// Nice to have
    Medium,
    /// Core practice
    High,
}

impl Importance {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// One guideline document
#[derive(Debug, Clone)]
pub struct KnowledgeDocument {
    /// Snake-case category, e.g. `title_tags`
    pub category: String,
    /// Weight used to break ranking ties
    pub importance: Importance,
    /// Guidance text
    pub content: String,
    terms: HashSet<String>,
}

impl KnowledgeDocument {
    /// Creates a document and indexes its terms
    pub fn new(category: &str, importance: Importance, content: &str) -> Self {
        let mut terms = tokenize(&category.replace('_', " "));
        terms.extend(tokenize(content));
        Self {
            category: category.to_string(),
            importance,
            content: content.to_string(),
            terms,
        }
    }

    fn title(&self) -> String {
        self.category
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

/// In-memory guideline store ranked by term overlap
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    documents: Vec<KnowledgeDocument>,
    max_results: usize,
}

impl KnowledgeBase {
    /// Creates a knowledge base over `documents`
    pub fn new(documents: Vec<KnowledgeDocument>, max_results: usize) -> Self {
        Self {
            documents,
            max_results,
        }
    }

    /// Creates a knowledge base seeded with the built-in SEO guidelines
    pub fn seo_defaults(max_results: usize) -> Self {
        Self::new(default_documents(), max_results)
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents matching `query`, best first
    ///
    /// Only documents sharing at least one term with the query are returned.
    pub fn search(&self, query: &str) -> Vec<&KnowledgeDocument> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, usize, &KnowledgeDocument)> = self
            .documents
            .iter()
            .enumerate()
            .filter_map(|(position, doc)| {
                let overlap = query_terms.intersection(&doc.terms).count();
                (overlap > 0).then_some((overlap, position, doc))
            })
            .collect();

        // Highest overlap, then importance, then original order
        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.2.importance.cmp(&a.2.importance))
                .then_with(|| a.1.cmp(&b.1))
        });

        scored
            .into_iter()
            .take(self.max_results)
            .map(|(_, _, doc)| doc)
            .collect()
    }
}

#[async_trait]
impl KnowledgeRetriever for KnowledgeBase {
    async fn retrieve(&self, query: &str, hint: Option<&str>) -> String {
        let search_query = match hint.filter(|h| !h.trim().is_empty()) {
            Some(hint) => format!("{} {}", hint, query),
            None => query.to_string(),
        };

        let matches = self.search(&search_query);
        tracing::debug!(matches = matches.len(), "Knowledge retrieval");
        format_context(&matches)
    }
}

fn format_context(documents: &[&KnowledgeDocument]) -> String {
    if documents.is_empty() {
        return String::new();
    }

    let mut parts = vec!["## Relevant SEO Knowledge:".to_string()];
    for (i, doc) in documents.iter().enumerate() {
        parts.push(format!(
            "\n{}. **{}** ({} importance):\n   {}",
            i + 1,
            doc.title(),
            doc.importance.as_str(),
            doc.content
        ));
    }
    parts.push("\n## Instructions:".to_string());
    parts.push(
        "Use the above SEO knowledge to inform your recommendations. \
         Ensure your suggestions align with these best practices."
            .to_string(),
    );

    parts.join("\n")
}

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "about", "that", "this", "are", "from", "your", "you", "into",
    "use", "should", "them", "they", "our", "its", "can", "make", "write",
];

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.len() >= 3 && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

fn default_documents() -> Vec<KnowledgeDocument> {
    vec![
        KnowledgeDocument::new(
            "title_tags",
            Importance::High,
            "Title tags should be 50-60 characters long and include primary keywords near the \
            beginning. They appear in search results and browser tabs.",
        ),
        KnowledgeDocument::new(
            "meta_description",
            Importance::High,
            "Meta descriptions should be 150-160 characters, compelling, and include target \
            keywords. They influence click-through rates from search results.",
        ),
        KnowledgeDocument::new(
            "content",
            Importance::High,
            "Page content should be comprehensive, original, and provide value to users. \
            Aim for 300+ words with natural keyword integration.",
        ),
        KnowledgeDocument::new(
            "headers",
            Importance::Medium,
            "Header tags (H1, H2, H3) create content hierarchy. \
            Use one H1 per page with primary keyword, and H2-H6 for subheadings.",
        ),
        KnowledgeDocument::new(
            "internal_linking",
            Importance::Medium,
            "Internal linking helps search engines understand site structure and distributes page \
            authority. Use descriptive anchor text.",
        ),
        KnowledgeDocument::new(
            "performance",
            Importance::High,
            "Page loading speed affects SEO rankings. \
            Optimize images, minimize CSS/JS, and use CDNs for better performance.",
        ),
        KnowledgeDocument::new(
            "mobile",
            Importance::High,
            "Mobile-first design is crucial as Google uses mobile-first indexing. \
            Ensure responsive design and fast mobile loading.",
        ),
        KnowledgeDocument::new(
            "schema",
            Importance::Medium,
            "Schema markup helps search engines understand content context. \
            Use structured data for rich snippets and better visibility.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seo_defaults_has_eight_documents() {
        let kb = KnowledgeBase::seo_defaults(3);
        assert_eq!(kb.len(), 8);
    }

    #[test]
    fn test_search_ranks_by_overlap() {
        let kb = KnowledgeBase::seo_defaults(3);
        let results = kb.search("meta description click-through");
        assert_eq!(results[0].category, "meta_description");
    }

    #[test]
    fn test_search_respects_max_results() {
        let kb = KnowledgeBase::seo_defaults(2);
        let results = kb.search("search engines page content keywords mobile schema");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_without_overlap_is_empty() {
        let kb = KnowledgeBase::seo_defaults(3);
        assert!(kb.search("zzz qqq").is_empty());
        assert!(kb.search("").is_empty());
    }

    #[test]
    fn test_category_title_case() {
        let doc = KnowledgeDocument::new("internal_linking", Importance::Medium, "x");
        assert_eq!(doc.title(), "Internal Linking");
    }

    #[tokio::test]
    async fn test_retrieve_formats_block() {
        let kb = KnowledgeBase::seo_defaults(1);
        let block = kb.retrieve("title tags", Some("Running shoes")).await;

        assert!(block.starts_with(
            "## Relevant SEO Knowledge:\n\n1. **Title Tags** (high importance):\n   Title tags"
        ));
        assert!(block.contains("\n## Instructions:\n"));
        assert!(block.ends_with("align with these best practices."));
    }

    #[tokio::test]
    async fn test_retrieve_miss_is_empty() {
        let kb = KnowledgeBase::seo_defaults(3);
        assert_eq!(kb.retrieve("zzz", None).await, "");
    }

    #[tokio::test]
    async fn test_no_knowledge_is_empty() {
        assert_eq!(NoKnowledge.retrieve("title tags", None).await, "");
    }
}
