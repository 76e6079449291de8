//! Pipeline stage machine and persistent project state.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::cache_key::CacheKey;
use crate::error::CoreError;
use crate::media::{AudioSegment, SubtitleEntry, VisualArtifact};
use crate::script::{Audience, DemoScript};
use crate::transitions::TransitionPlan;

/// One phase of the five-step pipeline, plus the two terminal states.
///
/// A project only ever moves forward through the stage sequence, or to
/// [`PipelineStage::Failed`] from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Analyze,
    Script,
    Capture,
    Voice,
    Assemble,
    Complete,
    Failed,
}

impl PipelineStage {
    /// Stable wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Analyze => "analyze",
            PipelineStage::Script => "script",
            PipelineStage::Capture => "capture",
            PipelineStage::Voice => "voice",
            PipelineStage::Assemble => "assemble",
            PipelineStage::Complete => "complete",
            PipelineStage::Failed => "failed",
        }
    }

    /// Position in the forward stage order. `Failed` sits outside the
    /// order and is only reachable via [`ProjectState::fail`].
    fn position(&self) -> u8 {
        match self {
            PipelineStage::Analyze => 0,
            PipelineStage::Script => 1,
            PipelineStage::Capture => 2,
            PipelineStage::Voice => 3,
            PipelineStage::Assemble => 4,
            PipelineStage::Complete => 5,
            PipelineStage::Failed => 6,
        }
    }

    /// Whether no further transitions are possible from this stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Complete | PipelineStage::Failed)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The failure that moved a project into the `Failed` stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageFailure {
    /// The stage that was executing when the failure occurred.
    pub stage: PipelineStage,
    pub message: String,
    pub failed_at: DateTime<Utc>,
}

/// Full record of one pipeline run, persisted keyed by project id.
///
/// Stage outputs are owned exclusively by this record; the pipeline cache
/// holds independent copies keyed by `(cache_key, stage)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectState {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Input echo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    pub audience: Audience,
    pub target_duration_seconds: u32,

    // Stage outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<DemoScript>,
    #[serde(default)]
    pub visuals: Vec<VisualArtifact>,
    #[serde(default)]
    pub audio: Vec<AudioSegment>,
    #[serde(default)]
    pub subtitles: Vec<SubtitleEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_plan: Option<TransitionPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    // Run state
    pub stage: PipelineStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<CacheKey>,
}

impl ProjectState {
    /// Create a fresh project at the `Analyze` stage.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        repo_url: Option<String>,
        website_url: Option<String>,
        audience: Audience,
        target_duration_seconds: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            repo_url,
            website_url,
            audience,
            target_duration_seconds,
            analysis: None,
            script: None,
            visuals: Vec::new(),
            audio: Vec::new(),
            subtitles: Vec::new(),
            transition_plan: None,
            output_path: None,
            stage: PipelineStage::Analyze,
            failure: None,
            cache_key: None,
        }
    }

    /// Advance to a later stage. Backward moves, self-moves, moves out of a
    /// terminal stage, and moves into `Failed` (use [`fail`](Self::fail))
    /// are rejected.
    pub fn advance_to(&mut self, next: PipelineStage) -> Result<(), CoreError> {
        if self.stage.is_terminal() {
            return Err(CoreError::InvalidTransition(format!(
                "project '{}' is already {}",
                self.id, self.stage
            )));
        }
        if next == PipelineStage::Failed {
            return Err(CoreError::InvalidTransition(
                "use fail() to record a stage failure".to_string(),
            ));
        }
        if next.position() <= self.stage.position() {
            return Err(CoreError::InvalidTransition(format!(
                "cannot move from {} back to {}",
                self.stage, next
            )));
        }
        self.stage = next;
        self.touch();
        Ok(())
    }

    /// Record a stage failure and move to the terminal `Failed` stage.
    /// Rejected when the project is already terminal, so a failure is
    /// recorded at most once and never overwrites a completed run.
    pub fn fail(
        &mut self,
        failed_stage: PipelineStage,
        message: impl Into<String>,
    ) -> Result<(), CoreError> {
        if self.stage.is_terminal() {
            return Err(CoreError::InvalidTransition(format!(
                "project '{}' is already {}",
                self.id, self.stage
            )));
        }
        self.failure = Some(StageFailure {
            stage: failed_stage,
            message: message.into(),
            failed_at: Utc::now(),
        });
        self.stage = PipelineStage::Failed;
        self.touch();
        Ok(())
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
