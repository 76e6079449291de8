//! Shared mock collaborators and fixtures for pipeline integration tests.
//!
//! Every mock counts its calls so tests can verify cache short-circuiting
//! and fail-fast behavior; capture mocks can additionally inject delays
//! and per-scene failures.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use reelsmith_core::analysis::{AnalysisResult, ProductFeature};
use reelsmith_core::media::VisualArtifact;
use reelsmith_core::script::{Audience, DemoScript, Scene, SceneKind};
use reelsmith_pipeline::services::{
    AnalysisService, RenderRequest, RenderService, ScriptService, ServiceError, SynthesizedAudio,
    VisionAnnotator, VisualCaptureService, VoiceSynthesisService,
};
use reelsmith_pipeline::{Pipeline, PipelineConfig, PipelineServices};

/// `n` filler words ending in a period, for exact narration word counts.
pub fn words(n: usize) -> String {
    let mut text = vec!["word"; n].join(" ");
    text.push('.');
    text
}

/// A title-card scene with an exact narration word count.
pub fn scene(id: &str, narration_words: usize) -> Scene {
    Scene {
        id: id.to_string(),
        kind: SceneKind::TitleCard,
        narration: words(narration_words),
        duration_seconds: 10.0,
        url: None,
        visual_content: String::new(),
        metadata: Default::default(),
    }
}

/// Canned analysis output.
pub fn sample_analysis() -> AnalysisResult {
    AnalysisResult {
        product_name: "Widget".into(),
        tagline: "Widgets for everyone".into(),
        category: "Developer tools".into(),
        target_users: vec!["developers".into()],
        key_features: vec![ProductFeature {
            name: "search".into(),
            description: "Full-text search".into(),
            importance: 8,
            demo_worthy: true,
        }],
        tech_stack: vec!["rust".into()],
        use_cases: vec!["finding widgets".into()],
        competitive_advantage: "It is fast".into(),
        repo_url: Some("https://github.com/acme/widget".into()),
        website_url: None,
        demo_urls: vec!["https://widget.example.com".into()],
        analyzed_at: Utc::now(),
    }
}

/// A script whose narration totals 225 words — exactly on budget for a
/// 90-second target at 150 words per minute.
pub fn sample_script() -> DemoScript {
    DemoScript {
        title: "Widget in 90 seconds".into(),
        audience: Audience::Developer,
        total_duration: 90.0,
        scenes: vec![scene("s1", 60), scene("s2", 60), scene("s3", 60)],
        intro: words(25),
        outro: words(20),
        call_to_action: String::new(),
        generated_at: Utc::now(),
    }
}

/// A script with no intro or outro narration, for pure scene fan-out tests.
pub fn scenes_only_script(scene_ids: &[&str]) -> DemoScript {
    DemoScript {
        title: "Scenes only".into(),
        audience: Audience::Developer,
        total_duration: 10.0 * scene_ids.len() as f64,
        scenes: scene_ids.iter().map(|id| scene(id, 10)).collect(),
        intro: String::new(),
        outro: String::new(),
        call_to_action: String::new(),
        generated_at: Utc::now(),
    }
}

/// The artifact a capture mock returns for a scene.
pub fn artifact_for(scene: &Scene) -> VisualArtifact {
    VisualArtifact {
        scene_id: scene.id.clone(),
        url: scene.url.clone(),
        image_path: PathBuf::from(format!("/tmp/screens/{}.png", scene.id)),
        width: 1920,
        height: 1080,
        captured_at: Utc::now(),
        highlights: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockAnalysisService {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl MockAnalysisService {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for MockAnalysisService {
    async fn analyze(
        &self,
        _repo_url: Option<&str>,
        _website_url: Option<&str>,
    ) -> Result<AnalysisResult, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ServiceError::new("analysis model unavailable"));
        }
        Ok(sample_analysis())
    }
}

pub struct MockScriptService {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub script: DemoScript,
}

impl MockScriptService {
    pub fn returning(script: DemoScript) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
            script,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockScriptService {
    fn default() -> Self {
        Self::returning(sample_script())
    }
}

#[async_trait]
impl ScriptService for MockScriptService {
    async fn generate(
        &self,
        _analysis: &AnalysisResult,
        _audience: Audience,
        _target_duration_seconds: u32,
    ) -> Result<DemoScript, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ServiceError::new("script model unavailable"));
        }
        Ok(self.script.clone())
    }
}

#[derive(Default)]
pub struct MockCaptureService {
    pub calls: AtomicUsize,
    /// Fixed per-capture delay.
    pub delay: Option<Duration>,
    /// Random per-capture delay range in milliseconds.
    pub random_delay_ms: Option<(u64, u64)>,
    /// Scene id whose capture fails.
    pub fail_scene: Option<String>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockCaptureService {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn observed_max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisualCaptureService for MockCaptureService {
    async fn capture(&self, scene: &Scene) -> Result<VisualArtifact, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        // Fail before any delay so fail-fast tests observe the abort
        // while slower captures are still in flight.
        if self.fail_scene.as_deref() == Some(scene.id.as_str()) {
            return Err(ServiceError::new("navigation timed out"));
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((lo, hi)) = self.random_delay_ms {
            let millis = {
                use rand::Rng;
                rand::rng().random_range(lo..=hi)
            };
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(artifact_for(scene))
    }
}

#[derive(Default)]
pub struct MockAnnotator {
    pub calls: AtomicUsize,
    /// Scene id whose annotation fails (non-fatally).
    pub fail_scene: Option<String>,
}

impl MockAnnotator {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionAnnotator for MockAnnotator {
    async fn suggest_highlights(
        &self,
        artifact: &VisualArtifact,
    ) -> Result<Vec<String>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_scene.as_deref() == Some(artifact.scene_id.as_str()) {
            return Err(ServiceError::new("vision quota exceeded"));
        }
        Ok(vec![format!("highlight:{}", artifact.scene_id)])
    }
}

#[derive(Default)]
pub struct MockVoiceService {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl MockVoiceService {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceSynthesisService for MockVoiceService {
    async fn synthesize(
        &self,
        text: &str,
        segment_id: &str,
    ) -> Result<SynthesizedAudio, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ServiceError::new("synthesis backend unavailable"));
        }
        // 150 wpm = 2.5 words per second.
        let word_count = text.split_whitespace().count();
        Ok(SynthesizedAudio {
            audio_path: PathBuf::from(format!("/tmp/audio/{segment_id}.wav")),
            duration_seconds: word_count as f64 / 2.5,
            voice_id: "af".into(),
        })
    }
}

#[derive(Default)]
pub struct MockRenderService {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl MockRenderService {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderService for MockRenderService {
    async fn render(&self, request: &RenderRequest) -> Result<PathBuf, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ServiceError::new("ffmpeg exited with status 1"));
        }
        Ok(request.output_path.clone())
    }
}

// ---------------------------------------------------------------------------
// Test harness
// ---------------------------------------------------------------------------

/// A pipeline wired to mocks, with handles kept for call-count assertions.
pub struct TestHarness {
    /// Keeps cache/output dirs alive for the duration of the test.
    pub dir: TempDir,
    pub analysis: Arc<MockAnalysisService>,
    pub script: Arc<MockScriptService>,
    pub capture: Arc<MockCaptureService>,
    pub annotator: Arc<MockAnnotator>,
    pub voice: Arc<MockVoiceService>,
    pub render: Arc<MockRenderService>,
    pub pipeline: Pipeline,
}

/// Build a harness with default (always-succeeding) mocks.
pub fn harness() -> TestHarness {
    harness_with(
        MockAnalysisService::default(),
        MockScriptService::default(),
        MockCaptureService::default(),
        MockAnnotator::default(),
        MockVoiceService::default(),
        MockRenderService::default(),
    )
}

/// Build a harness from specific mock instances.
pub fn harness_with(
    analysis: MockAnalysisService,
    script: MockScriptService,
    capture: MockCaptureService,
    annotator: MockAnnotator,
    voice: MockVoiceService,
    render: MockRenderService,
) -> TestHarness {
    // Surface pipeline logs when RUST_LOG is set; ignore double-init.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let dir = TempDir::new().expect("temp dir");
    let config = PipelineConfig {
        cache_dir: dir.path().join("cache"),
        output_dir: dir.path().join("output"),
        parallel_captures: 2,
        ..PipelineConfig::default()
    };

    let analysis = Arc::new(analysis);
    let script = Arc::new(script);
    let capture = Arc::new(capture);
    let annotator = Arc::new(annotator);
    let voice = Arc::new(voice);
    let render = Arc::new(render);

    let pipeline = Pipeline::new(
        config,
        PipelineServices {
            analysis: Arc::clone(&analysis) as _,
            script: Arc::clone(&script) as _,
            capture: Arc::clone(&capture) as _,
            annotator: Some(Arc::clone(&annotator) as _),
            voice: Arc::clone(&voice) as _,
            render: Arc::clone(&render) as _,
        },
    );

    TestHarness {
        dir,
        analysis,
        script,
        capture,
        annotator,
        voice,
        render,
        pipeline,
    }
}
