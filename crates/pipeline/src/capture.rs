//! Bounded-parallelism visual capture over a script's scenes.
//!
//! Intro and outro title cards are rendered synchronously (cheap, local);
//! scene captures run with at most `concurrency` in flight. Results come
//! back in scene-declaration order regardless of completion order, and the
//! first capture failure aborts every remaining capture (fail-fast).

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use reelsmith_core::duration::estimate_seconds;
use reelsmith_core::media::VisualArtifact;
use reelsmith_core::project::PipelineStage;
use reelsmith_core::script::{DemoScript, Scene};
use reelsmith_events::{ProgressBus, ProgressEvent};

use crate::error::StageError;
use crate::services::{ServiceError, VisionAnnotator, VisualCaptureService};

/// Message sent by each capture task on completion.
type CaptureOutcome = (usize, Result<VisualArtifact, ServiceError>);

/// Schedules visual capture for all narrated slots of a script.
pub struct CaptureScheduler {
    service: Arc<dyn VisualCaptureService>,
    annotator: Option<Arc<dyn VisionAnnotator>>,
    concurrency: usize,
    bus: Arc<ProgressBus>,
    /// Speaking rate used to give intro/outro title cards a duration.
    words_per_minute: u32,
}

impl CaptureScheduler {
    pub fn new(
        service: Arc<dyn VisualCaptureService>,
        annotator: Option<Arc<dyn VisionAnnotator>>,
        concurrency: usize,
        bus: Arc<ProgressBus>,
        words_per_minute: u32,
    ) -> Self {
        Self {
            service,
            annotator,
            concurrency: concurrency.max(1),
            bus,
            words_per_minute,
        }
    }

    /// Capture visuals for intro (when present), every scene, and outro
    /// (when present), in that order.
    pub async fn capture_all(&self, script: &DemoScript) -> Result<Vec<VisualArtifact>, StageError> {
        let has_intro = !script.intro.trim().is_empty();
        let has_outro = !script.outro.trim().is_empty();
        let total = script.scenes.len() + usize::from(has_intro) + usize::from(has_outro);
        let mut completed = 0usize;
        let mut artifacts = Vec::with_capacity(total);

        if has_intro {
            let artifact = self.capture_card("intro", &script.intro).await?;
            completed += 1;
            self.emit(completed, total, "Captured intro card");
            artifacts.push(artifact);
        }

        artifacts.extend(
            self.capture_scenes(&script.scenes, &mut completed, total)
                .await?,
        );

        if has_outro {
            let artifact = self.capture_card("outro", &script.outro).await?;
            completed += 1;
            self.emit(completed, total, "Captured outro card");
            artifacts.push(artifact);
        }

        self.emit(completed, total, format!("Captured {} visuals", artifacts.len()));
        Ok(artifacts)
    }

    /// Render an intro/outro title card synchronously.
    async fn capture_card(&self, slot_id: &str, text: &str) -> Result<VisualArtifact, StageError> {
        let duration = estimate_seconds(text, self.words_per_minute).max(1.0);
        let scene = Scene::title_card(slot_id, text, duration);
        self.service
            .capture(&scene)
            .await
            .map_err(|e| StageError::new(PipelineStage::Capture, format!("{slot_id} card: {e}")))
    }

    /// Fan scene captures out over the concurrency window.
    ///
    /// Each task reports its completion as a message over an `mpsc`
    /// channel; this single consumer assigns results into declaration-order
    /// slots and drives the (monotonic) progress fraction. There is no
    /// shared mutable progress state between tasks.
    async fn capture_scenes(
        &self,
        scenes: &[Scene],
        completed: &mut usize,
        total: usize,
    ) -> Result<Vec<VisualArtifact>, StageError> {
        if scenes.is_empty() {
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<CaptureOutcome>(scenes.len());
        let mut tasks = JoinSet::new();

        for (index, scene) in scenes.iter().enumerate() {
            let scene = scene.clone();
            let service = Arc::clone(&self.service);
            let annotator = self.annotator.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let tx = tx.clone();

            tasks.spawn(async move {
                let _permit = tokio::select! {
                    _ = cancel.cancelled() => return,
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                };
                if cancel.is_cancelled() {
                    return;
                }

                let mut result = service.capture(&scene).await;

                // Vision annotation is a side channel: a failure here is
                // logged per item and never fails the capture.
                if let (Ok(artifact), Some(annotator)) = (&mut result, annotator) {
                    match annotator.suggest_highlights(artifact).await {
                        Ok(highlights) => artifact.highlights = highlights,
                        Err(e) => {
                            tracing::warn!(
                                scene_id = %scene.id,
                                error = %e,
                                "Vision annotation failed",
                            );
                        }
                    }
                }

                let _ = tx.send((index, result)).await;
            });
        }
        drop(tx);

        let mut slots: Vec<Option<VisualArtifact>> = vec![None; scenes.len()];
        let mut received = 0usize;

        while let Some((index, result)) = rx.recv().await {
            match result {
                Ok(artifact) => {
                    slots[index] = Some(artifact);
                    received += 1;
                    *completed += 1;
                    self.emit(
                        *completed,
                        total,
                        format!(
                            "Captured scene {}/{}: {}",
                            index + 1,
                            scenes.len(),
                            scenes[index].id
                        ),
                    );
                    if received == scenes.len() {
                        break;
                    }
                }
                Err(e) => {
                    // Fail fast: abort in-flight and not-yet-started captures.
                    cancel.cancel();
                    tasks.shutdown().await;
                    return Err(StageError::new(
                        PipelineStage::Capture,
                        format!("capture failed for scene '{}': {e}", scenes[index].id),
                    ));
                }
            }
        }

        while tasks.join_next().await.is_some() {}

        let mut artifacts = Vec::with_capacity(scenes.len());
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(artifact) => artifacts.push(artifact),
                None => {
                    return Err(StageError::new(
                        PipelineStage::Capture,
                        format!(
                            "capture task for scene '{}' ended without a result",
                            scenes[index].id
                        ),
                    ));
                }
            }
        }
        Ok(artifacts)
    }

    fn emit(&self, completed: usize, total: usize, message: impl Into<String>) {
        let fraction = if total == 0 {
            1.0
        } else {
            completed as f64 / total as f64
        };
        self.bus.publish(
            ProgressEvent::new(PipelineStage::Capture, fraction, message)
                .with_items(completed, total),
        );
    }
}
