//! Collaborator service seams.
//!
//! The orchestrator decides whether, in what order, with what concurrency,
//! and under what cache policy each stage runs; *what* a stage computes is
//! owned by these collaborators (AI inference, browser capture, speech
//! synthesis, video rendering). Collaborators own their own timeouts and
//! internal retries.

use std::path::PathBuf;

use async_trait::async_trait;

use reelsmith_core::analysis::AnalysisResult;
use reelsmith_core::media::{AudioSegment, SubtitleEntry, VisualArtifact};
use reelsmith_core::script::{Audience, DemoScript, Scene};
use reelsmith_core::transitions::TransitionPlan;

/// Error returned by an external collaborator call. The orchestrator
/// treats any such error as a failure of the invoking stage.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ServiceError(String);

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for ServiceError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Extracts structured product knowledge from source references.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(
        &self,
        repo_url: Option<&str>,
        website_url: Option<&str>,
    ) -> Result<AnalysisResult, ServiceError>;
}

/// Generates a demo script for an audience and target duration.
///
/// The orchestrator may invoke this repeatedly (bounded) until the
/// narration word count lands within the duration budget.
#[async_trait]
pub trait ScriptService: Send + Sync {
    async fn generate(
        &self,
        analysis: &AnalysisResult,
        audience: Audience,
        target_duration_seconds: u32,
    ) -> Result<DemoScript, ServiceError>;
}

/// Captures or renders the visual for one scene.
#[async_trait]
pub trait VisualCaptureService: Send + Sync {
    async fn capture(&self, scene: &Scene) -> Result<VisualArtifact, ServiceError>;
}

/// Optional vision side channel: suggests highlight annotations for a
/// captured visual. A failure here never fails the capture itself.
#[async_trait]
pub trait VisionAnnotator: Send + Sync {
    async fn suggest_highlights(&self, artifact: &VisualArtifact) -> Result<Vec<String>, ServiceError>;
}

/// Result of synthesizing one narration segment.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub audio_path: PathBuf,
    pub duration_seconds: f64,
    pub voice_id: String,
}

/// Synthesizes narration audio for one segment.
#[async_trait]
pub trait VoiceSynthesisService: Send + Sync {
    async fn synthesize(&self, text: &str, segment_id: &str) -> Result<SynthesizedAudio, ServiceError>;
}

/// Everything the renderer needs to composite the final video.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub visuals: Vec<VisualArtifact>,
    pub audio: Vec<AudioSegment>,
    pub subtitles: Vec<SubtitleEntry>,
    /// SRT rendering of `subtitles`, ready to write next to the output.
    pub subtitle_srt: String,
    pub transitions: TransitionPlan,
    pub output_path: PathBuf,
}

/// Composites visuals, audio, subtitles, and transitions into the final
/// video file. Returns the path of the rendered file.
#[async_trait]
pub trait RenderService: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<PathBuf, ServiceError>;
}
