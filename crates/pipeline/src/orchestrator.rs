//! Pipeline orchestrator.
//!
//! Sequences the five stages (analyze → script → capture → voice →
//! assemble), probing the stage cache before each collaborator call and
//! recording outputs on the project record. A collaborator failure moves
//! the project to the terminal `Failed` stage and halts the run; later
//! stages are never attempted.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use reelsmith_cache::PipelineCache;
use reelsmith_core::analysis::AnalysisResult;
use reelsmith_core::cache_key::CacheKey;
use reelsmith_core::duration::NarrationBudget;
use reelsmith_core::media::{AudioSegment, SubtitleEntry, VisualArtifact};
use reelsmith_core::project::{PipelineStage, ProjectState};
use reelsmith_core::script::{Audience, DemoScript};
use reelsmith_core::subtitles::render_srt;
use reelsmith_core::timeline;
use reelsmith_core::transitions::{self, TransitionPlan};
use reelsmith_events::{ProgressBus, ProgressEvent};

use crate::capture::CaptureScheduler;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, StageError};
use crate::services::{
    AnalysisService, RenderRequest, RenderService, ScriptService, VisionAnnotator,
    VisualCaptureService, VoiceSynthesisService,
};
use crate::store::ProjectStore;

/// Collaborator bundle handed to [`Pipeline::new`].
pub struct PipelineServices {
    pub analysis: Arc<dyn AnalysisService>,
    pub script: Arc<dyn ScriptService>,
    pub capture: Arc<dyn VisualCaptureService>,
    pub annotator: Option<Arc<dyn VisionAnnotator>>,
    pub voice: Arc<dyn VoiceSynthesisService>,
    pub render: Arc<dyn RenderService>,
}

/// Inputs for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Project id; a UUID is generated when absent.
    pub project_id: Option<String>,
    /// Display name; defaults to the project id.
    pub name: Option<String>,
    pub repo_url: Option<String>,
    pub website_url: Option<String>,
    pub audience: Audience,
    pub target_duration_seconds: u32,
    /// Final video path; defaults to `<output_dir>/videos/<id>.mp4`.
    pub output_path: Option<PathBuf>,
}

/// Assemble stage payload: everything derived after voice synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssemblyOutput {
    output_path: PathBuf,
    transition_plan: TransitionPlan,
    subtitles: Vec<SubtitleEntry>,
    /// Audio segments with their master-timeline start times assigned.
    audio: Vec<AudioSegment>,
}

/// Orchestrates a full demo-video generation run.
pub struct Pipeline {
    config: PipelineConfig,
    cache: PipelineCache,
    store: ProjectStore,
    bus: Arc<ProgressBus>,
    analysis: Arc<dyn AnalysisService>,
    script: Arc<dyn ScriptService>,
    scheduler: CaptureScheduler,
    voice: Arc<dyn VoiceSynthesisService>,
    render: Arc<dyn RenderService>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, services: PipelineServices) -> Self {
        let bus = Arc::new(ProgressBus::default());
        let cache = PipelineCache::new(
            config.cache_dir.clone(),
            config.enable_caching,
            config.cache_ttl,
        );
        let store = ProjectStore::new(config.output_dir.join("projects"));
        let scheduler = CaptureScheduler::new(
            services.capture,
            services.annotator,
            config.parallel_captures,
            Arc::clone(&bus),
            config.words_per_minute,
        );
        Self {
            config,
            cache,
            store,
            bus,
            analysis: services.analysis,
            script: services.script,
            scheduler,
            voice: services.voice,
            render: services.render,
        }
    }

    /// Subscribe to progress events for all runs on this pipeline.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.bus.subscribe()
    }

    pub fn cache(&self) -> &PipelineCache {
        &self.cache
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Deterministic fingerprint of a run's logical inputs.
    pub fn compute_cache_key(request: &RunRequest) -> CacheKey {
        CacheKey::compute(
            request.repo_url.as_deref(),
            request.website_url.as_deref(),
            request.audience,
            request.target_duration_seconds,
        )
    }

    /// Execute the full pipeline for one request.
    ///
    /// Input problems (no source references, over-long target) are rejected
    /// before any stage runs. A stage failure is *not* an `Err`: the
    /// returned [`ProjectState`] carries the `Failed` stage and the
    /// recorded [`StageFailure`](reelsmith_core::project::StageFailure).
    pub async fn run(&self, request: RunRequest) -> Result<ProjectState, PipelineError> {
        if request.repo_url.is_none() && request.website_url.is_none() {
            return Err(PipelineError::MissingInput);
        }
        if request.target_duration_seconds == 0 {
            return Err(PipelineError::Validation(
                "target duration must be > 0 seconds".to_string(),
            ));
        }
        if request.target_duration_seconds > self.config.max_video_length_seconds {
            return Err(PipelineError::Validation(format!(
                "target duration {}s exceeds the maximum of {}s",
                request.target_duration_seconds, self.config.max_video_length_seconds
            )));
        }

        let id = request
            .project_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let name = request.name.clone().unwrap_or_else(|| id.clone());
        let mut project = ProjectState::new(
            id,
            name,
            request.repo_url.clone(),
            request.website_url.clone(),
            request.audience,
            request.target_duration_seconds,
        );
        let key = Self::compute_cache_key(&request);
        project.cache_key = Some(key.clone());

        tracing::info!(
            project_id = %project.id,
            cache_key = %key,
            audience = project.audience.as_str(),
            target_duration = project.target_duration_seconds,
            "Starting pipeline run",
        );

        if let Err(failure) = self.execute(&mut project, &key, &request).await {
            tracing::error!(
                project_id = %project.id,
                stage = %failure.stage,
                error = %failure.message,
                "Pipeline run failed",
            );
            self.bus.publish(
                ProgressEvent::new(
                    PipelineStage::Failed,
                    0.0,
                    format!("Pipeline failed: {}", failure.message),
                )
                .with_error(failure.message.clone()),
            );
            if let Err(e) = project.fail(failure.stage, failure.message) {
                tracing::warn!(project_id = %project.id, error = %e, "Could not record failure");
            }
        }

        if let Err(e) = self.store.save(&project).await {
            tracing::warn!(project_id = %project.id, error = %e, "Failed to persist project state");
        }

        Ok(project)
    }

    /// Run the stages in order, stopping at the first failure.
    async fn execute(
        &self,
        project: &mut ProjectState,
        key: &CacheKey,
        request: &RunRequest,
    ) -> Result<(), StageError> {
        // ---- Analyze ----
        self.emit(PipelineStage::Analyze, 0.0, "Starting analysis");
        let analysis = match self.cache.get::<AnalysisResult>(key, PipelineStage::Analyze).await {
            Some(analysis) => {
                self.emit(PipelineStage::Analyze, 1.0, "Analysis loaded from cache");
                analysis
            }
            None => {
                let analysis = self
                    .analysis
                    .analyze(project.repo_url.as_deref(), project.website_url.as_deref())
                    .await
                    .map_err(|e| StageError::new(PipelineStage::Analyze, e.to_string()))?;
                self.cache.set(key, PipelineStage::Analyze, &analysis).await;
                self.emit(PipelineStage::Analyze, 1.0, "Analysis complete");
                analysis
            }
        };
        project.analysis = Some(analysis.clone());
        advance(project, PipelineStage::Script)?;

        // ---- Script ----
        self.emit(PipelineStage::Script, 0.0, "Generating script");
        let script = match self.cache.get::<DemoScript>(key, PipelineStage::Script).await {
            Some(script) => {
                self.emit(PipelineStage::Script, 1.0, "Script loaded from cache");
                script
            }
            None => {
                let script = self
                    .generate_script(&analysis, project.audience, project.target_duration_seconds)
                    .await?;
                self.cache.set(key, PipelineStage::Script, &script).await;
                self.emit(
                    PipelineStage::Script,
                    1.0,
                    format!(
                        "Script generated: {} scenes, {} words",
                        script.scenes.len(),
                        script.total_words()
                    ),
                );
                script
            }
        };
        project.script = Some(script.clone());
        advance(project, PipelineStage::Capture)?;

        // ---- Capture ----
        self.emit(PipelineStage::Capture, 0.0, "Capturing visuals");
        let visuals = match self
            .cache
            .get::<Vec<VisualArtifact>>(key, PipelineStage::Capture)
            .await
        {
            Some(visuals) => {
                self.emit(PipelineStage::Capture, 1.0, "Visuals loaded from cache");
                visuals
            }
            None => {
                let visuals = self.scheduler.capture_all(&script).await?;
                self.cache.set(key, PipelineStage::Capture, &visuals).await;
                visuals
            }
        };
        project.visuals = visuals.clone();
        advance(project, PipelineStage::Voice)?;

        // ---- Voice ----
        self.emit(PipelineStage::Voice, 0.0, "Synthesizing voiceover");
        let audio = match self
            .cache
            .get::<Vec<AudioSegment>>(key, PipelineStage::Voice)
            .await
        {
            Some(audio) => {
                self.emit(PipelineStage::Voice, 1.0, "Voiceover loaded from cache");
                audio
            }
            None => {
                let audio = self.synthesize_voice(&script).await?;
                self.cache.set(key, PipelineStage::Voice, &audio).await;
                audio
            }
        };
        project.audio = audio.clone();
        advance(project, PipelineStage::Assemble)?;

        // ---- Assemble ----
        self.emit(PipelineStage::Assemble, 0.0, "Assembling video");
        let assembly = match self
            .cache
            .get::<AssemblyOutput>(key, PipelineStage::Assemble)
            .await
        {
            Some(assembly) => {
                self.emit(PipelineStage::Assemble, 1.0, "Assembly loaded from cache");
                assembly
            }
            None => {
                let placed = timeline::assign_start_times(audio);
                let subtitles = timeline::subtitles_from_audio(&placed, &self.config.subtitles);
                let durations: Vec<f64> = placed.iter().map(|s| s.duration_seconds).collect();
                let plan = transitions::plan(&durations, &self.config.transition);
                self.emit(
                    PipelineStage::Assemble,
                    0.5,
                    format!(
                        "Planned {} transitions, estimated {:.1}s",
                        plan.edges.len(),
                        plan.total_duration
                    ),
                );

                let output_path = request.output_path.clone().unwrap_or_else(|| {
                    self.config
                        .output_dir
                        .join("videos")
                        .join(format!("{}.mp4", project.id))
                });
                let render_request = RenderRequest {
                    visuals,
                    audio: placed.clone(),
                    subtitles: subtitles.clone(),
                    subtitle_srt: render_srt(&subtitles),
                    transitions: plan.clone(),
                    output_path,
                };
                let rendered = self
                    .render
                    .render(&render_request)
                    .await
                    .map_err(|e| StageError::new(PipelineStage::Assemble, e.to_string()))?;

                let assembly = AssemblyOutput {
                    output_path: rendered,
                    transition_plan: plan,
                    subtitles,
                    audio: placed,
                };
                self.cache.set(key, PipelineStage::Assemble, &assembly).await;
                self.emit(
                    PipelineStage::Assemble,
                    1.0,
                    format!("Video assembled: {}", assembly.output_path.display()),
                );
                assembly
            }
        };
        project.audio = assembly.audio;
        project.subtitles = assembly.subtitles;
        project.transition_plan = Some(assembly.transition_plan);
        project.output_path = Some(assembly.output_path);
        advance(project, PipelineStage::Complete)?;
        self.emit(PipelineStage::Complete, 1.0, "Pipeline complete");

        Ok(())
    }

    /// Invoke the script service until the narration lands within the
    /// duration budget, keeping the closest attempt, bounded by
    /// `script_max_attempts`.
    async fn generate_script(
        &self,
        analysis: &AnalysisResult,
        audience: Audience,
        target_duration_seconds: u32,
    ) -> Result<DemoScript, StageError> {
        let budget = NarrationBudget::new(target_duration_seconds, self.config.words_per_minute);
        let attempts = self.config.script_max_attempts.max(1);
        let mut best: Option<(u64, DemoScript)> = None;

        for attempt in 1..=attempts {
            self.emit(
                PipelineStage::Script,
                (attempt - 1) as f64 / attempts as f64,
                format!("Generating script (attempt {attempt}/{attempts})"),
            );
            let script = self
                .script
                .generate(analysis, audience, target_duration_seconds)
                .await
                .map_err(|e| StageError::new(PipelineStage::Script, e.to_string()))?;

            let words = script.total_words();
            let within = budget.within_bounds(words);
            let distance = (words as i64 - budget.target_words() as i64).unsigned_abs();
            if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                best = Some((distance, script));
            }
            if within {
                break;
            }
            tracing::debug!(
                attempt,
                words,
                target = budget.target_words(),
                "{}",
                budget.adjustment_hint(words),
            );
        }

        let (_, script) = best.ok_or_else(|| {
            StageError::new(PipelineStage::Script, "script generation produced no script")
        })?;
        if !budget.within_bounds(script.total_words()) {
            tracing::warn!(
                words = script.total_words(),
                min = budget.min_words(),
                max = budget.max_words(),
                "Accepting closest script after {attempts} attempts",
            );
        }
        script
            .validate()
            .map_err(|e| StageError::new(PipelineStage::Script, e.to_string()))?;
        Ok(script)
    }

    /// Synthesize narration audio for every segment, sequentially in
    /// document order. Start times are assigned later by the assembler.
    async fn synthesize_voice(&self, script: &DemoScript) -> Result<Vec<AudioSegment>, StageError> {
        let narrations = script.narrations();
        let total = narrations.len();
        let mut segments = Vec::with_capacity(total);

        for (i, (segment_id, text)) in narrations.into_iter().enumerate() {
            self.bus.publish(
                ProgressEvent::new(
                    PipelineStage::Voice,
                    (i + 1) as f64 / total as f64,
                    format!("Synthesizing audio {}/{}: {}", i + 1, total, segment_id),
                )
                .with_items(i + 1, total),
            );
            let audio = self
                .voice
                .synthesize(&text, &segment_id)
                .await
                .map_err(|e| {
                    StageError::new(PipelineStage::Voice, format!("segment '{segment_id}': {e}"))
                })?;
            if audio.duration_seconds <= 0.0 {
                return Err(StageError::new(
                    PipelineStage::Voice,
                    format!("segment '{segment_id}' synthesized with non-positive duration"),
                ));
            }
            segments.push(AudioSegment {
                scene_id: segment_id,
                text,
                audio_path: audio.audio_path,
                duration_seconds: audio.duration_seconds,
                start_time: 0.0,
                voice_id: audio.voice_id,
            });
        }

        Ok(segments)
    }

    fn emit(&self, stage: PipelineStage, fraction: f64, message: impl Into<String>) {
        self.bus.publish(ProgressEvent::new(stage, fraction, message));
    }
}

/// Advance the project's stage, converting an (unexpected) transition
/// rejection into a failure of the stage being entered.
fn advance(project: &mut ProjectState, next: PipelineStage) -> Result<(), StageError> {
    project
        .advance_to(next)
        .map_err(|e| StageError::new(next, e.to_string()))
}
