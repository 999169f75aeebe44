//! Two-stage suggestion pipeline
//!
//! Stage one sends the system prompt and assembled payload to the provider
//! and remaps the reply into a [`GeneratedDraft`]. Stage two validates the
//! draft into a [`PipelineOutput`]. The pipeline holds no per-call state.

use crate::agent::context::{assemble, Constraints, ContextRequest};
use crate::agent::history::History;
use crate::agent::suggestion::{self, GeneratedDraft, Suggestion, Validation};
use crate::config::Config;
use crate::error::{Result, SeoAssistantError};
use crate::knowledge::{KnowledgeBase, KnowledgeRetriever, NoKnowledge};
use crate::prompts::SEO_SYSTEM_PROMPT;
use crate::providers::Provider;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Result of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutput {
    /// Validated suggestion
    pub suggestion: Suggestion,
    /// Completeness heuristic in `[0, 100]`
    pub score: u8,
    /// Validation path taken
    pub validation: Validation,
}

/// Inputs describing one user turn
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// Owning session's title
    pub session_title: String,
    /// The user's instruction
    pub instruction: String,
    /// Opening or continuation history
    pub history: History,
}

/// Generation pipeline shared by synchronous requests and background jobs
pub struct SuggestionPipeline {
    provider: Arc<dyn Provider>,
    knowledge: Arc<dyn KnowledgeRetriever>,
    constraints: Constraints,
    timeout: Duration,
}

impl SuggestionPipeline {
    /// Create a pipeline
    pub fn new(
        provider: Arc<dyn Provider>,
        knowledge: Arc<dyn KnowledgeRetriever>,
        constraints: Constraints,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            knowledge,
            constraints,
            timeout,
        }
    }

    /// Build a pipeline from generation and knowledge settings
    pub fn from_config(config: &Config, provider: Arc<dyn Provider>) -> Self {
        let knowledge: Arc<dyn KnowledgeRetriever> = if config.knowledge.enabled {
            Arc::new(KnowledgeBase::seo_defaults(config.knowledge.max_results))
        } else {
            Arc::new(NoKnowledge)
        };

        Self::new(
            provider,
            knowledge,
            config.generation.constraints.clone(),
            Duration::from_secs(config.generation.timeout_seconds),
        )
    }

    /// Build the payload for a turn, including retrieved knowledge
    pub async fn payload(&self, turn: &TurnInput) -> String {
        let knowledge = self
            .knowledge
            .retrieve(&turn.instruction, Some(&turn.session_title))
            .await;

        let request =
            ContextRequest::opening(&turn.session_title, &turn.instruction, &self.constraints)
                .with_history(turn.history.anchor(), turn.history.draft())
                .with_knowledge(Some(&knowledge));

        assemble(&request)
    }

    /// Stage one: call the provider and resolve field aliases
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::Timeout` if the provider does not answer
    /// in time, or `SeoAssistantError::Generation` on provider failure
    pub async fn generate(&self, payload: &str) -> Result<GeneratedDraft> {
        tracing::debug!(
            provider = self.provider.name(),
            model = %self.provider.model(),
            bytes = payload.len(),
            "Requesting suggestion"
        );

        let raw = tokio::time::timeout(
            self.timeout,
            self.provider.chat_json(SEO_SYSTEM_PROMPT, payload),
        )
        .await
        .map_err(|_| SeoAssistantError::Timeout {
            seconds: self.timeout.as_secs(),
        })??;

        Ok(GeneratedDraft::from_object(&raw))
    }

    /// Stage two: validate and score a draft
    pub fn validate(&self, draft: &GeneratedDraft) -> PipelineOutput {
        let validated = suggestion::validate(draft);
        let score = suggestion::score(&validated.suggestion, &self.constraints);

        PipelineOutput {
            suggestion: validated.suggestion,
            score,
            validation: validated.validation,
        }
    }

    /// Run both stages for a turn
    pub async fn run(&self, turn: &TurnInput) -> Result<PipelineOutput> {
        let payload = self.payload(turn).await;
        let draft = self.generate(&payload).await?;
        let output = self.validate(&draft);

        tracing::info!(
            score = output.score,
            validation = ?output.validation,
            continuation = turn.history.is_continuation(),
            "Suggestion generated"
        );

        Ok(output)
    }
}
