//! Renderer adapter utilities: ffmpeg `xfade` filter-graph construction.
//!
//! Turns an abstract [`TransitionPlan`] into the `-filter_complex` string a
//! renderer passes to ffmpeg. Kept separate from the planner so the core
//! stays free of renderer syntax.

use reelsmith_core::transitions::{TransitionEdge, TransitionPlan};

use crate::error::PipelineError;

/// Format a single `xfade` filter expression for one edge.
pub fn xfade_filter(edge: &TransitionEdge) -> String {
    format!(
        "xfade=transition={}:duration={}:offset={}",
        edge.kind.as_str(),
        edge.duration,
        edge.offset
    )
}

/// Build the full `-filter_complex` chain for `input_count` video inputs.
///
/// Each edge consumes the previous chain output and the next input:
/// `[0:v][1:v]xfade…[v01];[v01][2:v]xfade…[outv]`. A single input needs no
/// transitions and is passed through as `[0:v]copy[outv]`.
pub fn build_filter_complex(
    plan: &TransitionPlan,
    input_count: usize,
) -> Result<String, PipelineError> {
    if input_count < 2 {
        return Ok("[0:v]copy[outv]".to_string());
    }
    if plan.edges.len() != input_count - 1 {
        return Err(PipelineError::Validation(format!(
            "Transition plan has {} edges but {} inputs require {}",
            plan.edges.len(),
            input_count,
            input_count - 1
        )));
    }

    let last = plan.edges.len() - 1;
    let mut parts = Vec::with_capacity(plan.edges.len());

    for (i, edge) in plan.edges.iter().enumerate() {
        let input_a = if i == 0 {
            "[0:v]".to_string()
        } else {
            format!("[v{}{}]", i - 1, i)
        };
        let input_b = format!("[{}:v]", i + 1);
        let output = if i == last {
            "[outv]".to_string()
        } else {
            format!("[v{}{}]", i, i + 1)
        };
        parts.push(format!("{input_a}{input_b}{}{output}", xfade_filter(edge)));
    }

    Ok(parts.join(";"))
}
