//! Pipeline error types.
//!
//! A stage failure is a value threaded through the orchestrator, not an
//! exception: each stage helper returns `Result<T, StageError>` and the
//! orchestrator converts the first error into the project's terminal
//! `Failed` state.

use reelsmith_core::project::PipelineStage;
use reelsmith_core::CoreError;

/// A collaborator failure scoped to the stage that was executing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{stage} stage failed: {message}")]
pub struct StageError {
    pub stage: PipelineStage,
    pub message: String,
}

impl StageError {
    pub fn new(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Errors that reject a run before any stage executes.
///
/// Stage failures are not represented here — a run that fails mid-pipeline
/// still returns its (failed) `ProjectState`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("at least one of repo_url or website_url must be provided")]
    MissingInput,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
