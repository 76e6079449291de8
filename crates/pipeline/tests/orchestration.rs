//! End-to-end orchestration tests over mock collaborators.
//!
//! Cover stage sequencing, per-stage cache short-circuiting, fail-fast
//! stage failure handling, input rejection, progress ordering, and
//! project state persistence.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use assert_matches::assert_matches;

use common::*;
use reelsmith_core::project::PipelineStage;
use reelsmith_core::script::Audience;
use reelsmith_pipeline::error::PipelineError;
use reelsmith_pipeline::{Pipeline, PipelineConfig, PipelineServices, RunRequest};

fn request(project_id: &str) -> RunRequest {
    RunRequest {
        project_id: Some(project_id.to_string()),
        name: None,
        repo_url: Some("https://github.com/acme/widget".to_string()),
        website_url: None,
        audience: Audience::Developer,
        target_duration_seconds: 90,
        output_path: None,
    }
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_run_reaches_complete_with_all_outputs() {
    let h = harness();
    let project = h.pipeline.run(request("p1")).await.unwrap();

    assert_eq!(project.stage, PipelineStage::Complete);
    assert!(project.failure.is_none());
    assert!(project.analysis.is_some());
    assert!(project.script.is_some());
    // intro + 3 scenes + outro
    assert_eq!(project.visuals.len(), 5);
    assert_eq!(project.audio.len(), 5);
    assert!(!project.subtitles.is_empty());
    // 5 audio-backed slots -> 4 transitions
    assert_eq!(project.transition_plan.as_ref().unwrap().edges.len(), 4);
    assert!(project.output_path.is_some());
    assert!(project.cache_key.is_some());
}

#[tokio::test]
async fn default_output_path_is_under_output_dir() {
    let h = harness();
    let project = h.pipeline.run(request("p1")).await.unwrap();
    let path = project.output_path.unwrap();
    assert!(path.ends_with("videos/p1.mp4"), "unexpected path: {path:?}");
}

#[tokio::test]
async fn visuals_are_in_document_order_with_edge_slots() {
    let h = harness();
    let project = h.pipeline.run(request("p1")).await.unwrap();
    let ids: Vec<&str> = project.visuals.iter().map(|v| v.scene_id.as_str()).collect();
    assert_eq!(ids, vec!["intro", "s1", "s2", "s3", "outro"]);
}

#[tokio::test]
async fn audio_start_times_are_cumulative() {
    let h = harness();
    let project = h.pipeline.run(request("p1")).await.unwrap();

    let mut expected_start = 0.0;
    for segment in &project.audio {
        assert!((segment.start_time - expected_start).abs() < 1e-9);
        expected_start += segment.duration_seconds;
    }
}

#[tokio::test]
async fn subtitle_indices_are_contiguous() {
    let h = harness();
    let project = h.pipeline.run(request("p1")).await.unwrap();

    for (i, entry) in project.subtitles.iter().enumerate() {
        assert_eq!(entry.index, i + 1);
        assert!(entry.end_time > entry.start_time);
    }
}

#[tokio::test]
async fn completed_state_is_persisted() {
    let h = harness();
    h.pipeline.run(request("p1")).await.unwrap();

    let loaded = h.pipeline.store().load("p1").await.unwrap().unwrap();
    assert_eq!(loaded.stage, PipelineStage::Complete);
    assert_eq!(loaded.visuals.len(), 5);
}

// ---------------------------------------------------------------------------
// Caching
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_run_short_circuits_every_stage() {
    let h = harness();

    h.pipeline.run(request("p1")).await.unwrap();
    assert_eq!(h.analysis.call_count(), 1);
    assert_eq!(h.script.call_count(), 1);
    assert_eq!(h.capture.call_count(), 5);
    assert_eq!(h.voice.call_count(), 5);
    assert_eq!(h.render.call_count(), 1);

    let second = h.pipeline.run(request("p2")).await.unwrap();
    assert_eq!(second.stage, PipelineStage::Complete);
    assert_eq!(second.visuals.len(), 5);

    // Identical inputs: every stage served from cache, zero new calls.
    assert_eq!(h.analysis.call_count(), 1);
    assert_eq!(h.script.call_count(), 1);
    assert_eq!(h.capture.call_count(), 5);
    assert_eq!(h.voice.call_count(), 5);
    assert_eq!(h.render.call_count(), 1);
}

#[tokio::test]
async fn different_audience_does_not_share_cache() {
    let h = harness();
    h.pipeline.run(request("p1")).await.unwrap();

    let mut other = request("p2");
    other.audience = Audience::Investor;
    h.pipeline.run(other).await.unwrap();

    assert_eq!(h.analysis.call_count(), 2);
    assert_eq!(h.script.call_count(), 2);
    assert_eq!(h.render.call_count(), 2);
}

#[tokio::test]
async fn different_target_duration_does_not_share_cache() {
    let h = harness();
    h.pipeline.run(request("p1")).await.unwrap();

    let mut other = request("p2");
    other.target_duration_seconds = 120;
    h.pipeline.run(other).await.unwrap();

    assert_eq!(h.analysis.call_count(), 2);
}

#[tokio::test]
async fn failed_run_reuses_cached_upstream_stages_on_reentry() {
    // First run fails at the assemble stage.
    let failing = harness_with(
        MockAnalysisService::default(),
        MockScriptService::default(),
        MockCaptureService::default(),
        MockAnnotator::default(),
        MockVoiceService::default(),
        MockRenderService {
            fail: true,
            ..Default::default()
        },
    );
    let project = failing.pipeline.run(request("p1")).await.unwrap();
    assert_eq!(project.stage, PipelineStage::Failed);
    assert_eq!(project.failure.as_ref().unwrap().stage, PipelineStage::Assemble);

    // A fresh orchestration over the same cache dir only re-runs the
    // failed stage: upstream collaborators are never called again.
    let analysis = Arc::new(MockAnalysisService::default());
    let script = Arc::new(MockScriptService::default());
    let capture = Arc::new(MockCaptureService::default());
    let voice = Arc::new(MockVoiceService::default());
    let render = Arc::new(MockRenderService::default());
    let config = PipelineConfig {
        cache_dir: failing.dir.path().join("cache"),
        output_dir: failing.dir.path().join("output"),
        parallel_captures: 2,
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(
        config,
        PipelineServices {
            analysis: Arc::clone(&analysis) as _,
            script: Arc::clone(&script) as _,
            capture: Arc::clone(&capture) as _,
            annotator: None,
            voice: Arc::clone(&voice) as _,
            render: Arc::clone(&render) as _,
        },
    );

    let retried = pipeline.run(request("p1-retry")).await.unwrap();
    assert_eq!(retried.stage, PipelineStage::Complete);
    assert_eq!(analysis.call_count(), 0);
    assert_eq!(script.call_count(), 0);
    assert_eq!(capture.call_count(), 0);
    assert_eq!(voice.call_count(), 0);
    assert_eq!(render.call_count(), 1);
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn script_failure_halts_before_later_stages() {
    let h = harness_with(
        MockAnalysisService::default(),
        MockScriptService {
            fail: true,
            ..MockScriptService::default()
        },
        MockCaptureService::default(),
        MockAnnotator::default(),
        MockVoiceService::default(),
        MockRenderService::default(),
    );

    let project = h.pipeline.run(request("p1")).await.unwrap();

    assert_eq!(project.stage, PipelineStage::Failed);
    let failure = project.failure.as_ref().unwrap();
    assert_eq!(failure.stage, PipelineStage::Script);
    assert!(failure.message.contains("script model unavailable"));

    // The analyze output survived; nothing downstream ran.
    assert!(project.analysis.is_some());
    assert!(project.script.is_none());
    assert_eq!(h.capture.call_count(), 0);
    assert_eq!(h.voice.call_count(), 0);
    assert_eq!(h.render.call_count(), 0);
}

#[tokio::test]
async fn capture_failure_is_a_stage_failure() {
    let h = harness_with(
        MockAnalysisService::default(),
        MockScriptService::default(),
        MockCaptureService {
            fail_scene: Some("s2".into()),
            ..Default::default()
        },
        MockAnnotator::default(),
        MockVoiceService::default(),
        MockRenderService::default(),
    );

    let project = h.pipeline.run(request("p1")).await.unwrap();

    assert_eq!(project.stage, PipelineStage::Failed);
    let failure = project.failure.as_ref().unwrap();
    assert_eq!(failure.stage, PipelineStage::Capture);
    assert!(failure.message.contains("s2"));
    assert_eq!(h.voice.call_count(), 0);
    assert_eq!(h.render.call_count(), 0);
}

#[tokio::test]
async fn failed_state_is_persisted() {
    let h = harness_with(
        MockAnalysisService {
            fail: true,
            ..Default::default()
        },
        MockScriptService::default(),
        MockCaptureService::default(),
        MockAnnotator::default(),
        MockVoiceService::default(),
        MockRenderService::default(),
    );

    h.pipeline.run(request("p1")).await.unwrap();
    let loaded = h.pipeline.store().load("p1").await.unwrap().unwrap();
    assert_eq!(loaded.stage, PipelineStage::Failed);
    assert_eq!(loaded.failure.as_ref().unwrap().stage, PipelineStage::Analyze);
}

// ---------------------------------------------------------------------------
// Input rejection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_both_source_refs_rejected_before_any_stage() {
    let h = harness();
    let result = h
        .pipeline
        .run(RunRequest {
            project_id: Some("p1".into()),
            target_duration_seconds: 90,
            ..Default::default()
        })
        .await;

    assert_matches!(result, Err(PipelineError::MissingInput));
    assert_eq!(h.analysis.call_count(), 0);
}

#[tokio::test]
async fn over_long_target_duration_rejected() {
    let h = harness();
    let mut req = request("p1");
    req.target_duration_seconds = 10_000;
    assert_matches!(h.pipeline.run(req).await, Err(PipelineError::Validation(_)));
    assert_eq!(h.analysis.call_count(), 0);
}

#[tokio::test]
async fn zero_target_duration_rejected() {
    let h = harness();
    let mut req = request("p1");
    req.target_duration_seconds = 0;
    assert_matches!(h.pipeline.run(req).await, Err(PipelineError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn progress_fractions_are_monotonic_within_each_stage() {
    let h = harness();
    let mut rx = h.pipeline.subscribe();

    h.pipeline.run(request("p1")).await.unwrap();

    let mut last_by_stage: HashMap<&'static str, f64> = HashMap::new();
    let mut event_count = 0;
    while let Ok(event) = rx.try_recv() {
        event_count += 1;
        assert!((0.0..=1.0).contains(&event.fraction));
        let last = last_by_stage.entry(event.stage.as_str()).or_insert(0.0);
        assert!(
            event.fraction >= *last,
            "fraction regressed in stage {}: {} -> {}",
            event.stage,
            last,
            event.fraction
        );
        *last = event.fraction;
    }

    assert!(event_count > 0);
    assert_eq!(last_by_stage.get("capture"), Some(&1.0));
    assert_eq!(last_by_stage.get("complete"), Some(&1.0));
}

#[tokio::test]
async fn failure_emits_terminal_error_event() {
    let h = harness_with(
        MockAnalysisService::default(),
        MockScriptService {
            fail: true,
            ..MockScriptService::default()
        },
        MockCaptureService::default(),
        MockAnnotator::default(),
        MockVoiceService::default(),
        MockRenderService::default(),
    );
    let mut rx = h.pipeline.subscribe();

    h.pipeline.run(request("p1")).await.unwrap();

    let mut failure_event = None;
    while let Ok(event) = rx.try_recv() {
        if event.stage == PipelineStage::Failed {
            failure_event = Some(event);
        }
    }
    let event = failure_event.expect("a failed-stage event");
    assert!(event.error.as_deref().unwrap().contains("script model unavailable"));
}

// ---------------------------------------------------------------------------
// Script duration convergence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn off_budget_script_is_retried_up_to_the_attempt_bound() {
    // 60 words is far below the 202-word minimum for 90s at 150 wpm, so
    // every attempt misses the budget and the bound is exhausted.
    let mut script = sample_script();
    script.scenes = vec![scene("s1", 60)];
    script.intro = String::new();
    script.outro = String::new();

    let h = harness_with(
        MockAnalysisService::default(),
        MockScriptService::returning(script),
        MockCaptureService::default(),
        MockAnnotator::default(),
        MockVoiceService::default(),
        MockRenderService::default(),
    );

    let project = h.pipeline.run(request("p1")).await.unwrap();

    // Closest attempt is accepted; the run still completes.
    assert_eq!(project.stage, PipelineStage::Complete);
    assert_eq!(h.script.call_count(), 3);
}

#[tokio::test]
async fn on_budget_script_needs_a_single_attempt() {
    let h = harness();
    h.pipeline.run(request("p1")).await.unwrap();
    assert_eq!(h.script.call_count(), 1);
}
