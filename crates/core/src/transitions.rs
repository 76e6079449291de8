//! Scene-to-scene transition planning.
//!
//! Computes the ordered crossfade edges needed to concatenate scenes with
//! overlapping transitions, plus the resulting total duration. Turning a
//! plan into a concrete renderer filter graph is the render adapter's job.

use serde::{Deserialize, Serialize};

/// Crossfade vocabulary (a subset of the ffmpeg `xfade` transition names).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    #[default]
    Fade,
    FadeBlack,
    FadeWhite,
    Dissolve,
    WipeLeft,
    WipeRight,
    SlideLeft,
    SlideRight,
    CircleCrop,
    Pixelize,
}

impl TransitionKind {
    /// The ffmpeg `xfade` transition name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Fade => "fade",
            TransitionKind::FadeBlack => "fadeblack",
            TransitionKind::FadeWhite => "fadewhite",
            TransitionKind::Dissolve => "dissolve",
            TransitionKind::WipeLeft => "wipeleft",
            TransitionKind::WipeRight => "wiperight",
            TransitionKind::SlideLeft => "slideleft",
            TransitionKind::SlideRight => "slideright",
            TransitionKind::CircleCrop => "circlecrop",
            TransitionKind::Pixelize => "pixelize",
        }
    }
}

/// Transition kind and per-transition duration used across a whole plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub kind: TransitionKind,
    pub duration: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            kind: TransitionKind::Fade,
            duration: 1.0,
        }
    }
}

/// One crossfade between two adjoining scenes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEdge {
    pub from_index: usize,
    pub to_index: usize,
    /// Time on the composited timeline at which the transition starts.
    pub offset: f64,
    pub duration: f64,
    pub kind: TransitionKind,
}

/// Ordered edge list plus the composited total duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionPlan {
    pub edges: Vec<TransitionEdge>,
    pub total_duration: f64,
}

/// Plan the transition chain for an ordered list of scene durations.
///
/// Edge `i` starts at `(Σ_{k≤i} duration_k) - (i+1)·d`: each transition of
/// length `d` overlaps the running total by `d`, so the composited total is
/// `Σ duration_k - (N-1)·d`. Fewer than two scenes yield an empty edge list.
///
/// The arithmetic is not clamped: a transition longer than one of its
/// adjoining scenes produces a degenerate (possibly negative) offset. Such
/// inputs are logged and passed through unchanged.
pub fn plan(scene_durations: &[f64], config: &TransitionConfig) -> TransitionPlan {
    let sum: f64 = scene_durations.iter().sum();
    let n = scene_durations.len();
    if n < 2 {
        return TransitionPlan {
            edges: Vec::new(),
            total_duration: sum,
        };
    }

    let d = config.duration;
    let mut edges = Vec::with_capacity(n - 1);
    let mut cumulative = 0.0;

    for i in 0..n - 1 {
        cumulative += scene_durations[i];
        let offset = cumulative - (i as f64 + 1.0) * d;

        if d > scene_durations[i].min(scene_durations[i + 1]) {
            tracing::warn!(
                edge = i,
                transition_duration = d,
                from_duration = scene_durations[i],
                to_duration = scene_durations[i + 1],
                "Transition longer than an adjoining scene; offset left unclamped",
            );
        }

        edges.push(TransitionEdge {
            from_index: i,
            to_index: i + 1,
            offset,
            duration: d,
            kind: config.kind,
        });
    }

    TransitionPlan {
        edges,
        total_duration: sum - (n - 1) as f64 * d,
    }
}

/// Composited duration of `scene_durations` with `(N-1)` overlapping
/// transitions of length `transition_duration`.
pub fn estimate_total_duration(scene_durations: &[f64], transition_duration: f64) -> f64 {
    let sum: f64 = scene_durations.iter().sum();
    let overlaps = scene_durations.len().saturating_sub(1) as f64;
    sum - overlaps * transition_duration
}
