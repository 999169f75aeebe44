//! Suggestion generation
//!
//! Context assembly, the two-stage generation pipeline, output validation,
//! and the background job state machine that drives asynchronous turns.

pub mod context;
pub mod history;
pub mod job;
pub mod metrics;
pub mod pipeline;
pub mod suggestion;

pub use context::{assemble, Constraints, ContextRequest};
pub use history::History;
pub use job::{FailureKind, JobOutcome, JobRunner};
pub use pipeline::{PipelineOutput, SuggestionPipeline, TurnInput};
pub use suggestion::{GeneratedDraft, Suggestion, Validation};
