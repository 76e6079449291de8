//! Subtitle text chunking and SRT rendering.
//!
//! Narration text is split into caption-sized chunks: each chunk, when
//! word-wrapped at the configured line width, must fit the configured line
//! count. Splitting prefers sentence boundaries; a sentence that cannot fit
//! on its own is force-split at word boundaries.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::media::SubtitleEntry;

/// Matches one sentence (terminated by `.`, `!`, or `?` plus trailing
/// whitespace) or a trailing fragment with no terminal punctuation.
static SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]*[.!?]+(?:\s+|$)|[^.!?]+$").expect("valid regex"));

/// Per-caption layout constraints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubtitleLimits {
    pub max_chars_per_line: usize,
    pub max_lines: usize,
}

impl Default for SubtitleLimits {
    fn default() -> Self {
        Self {
            max_chars_per_line: 42,
            max_lines: 2,
        }
    }
}

/// Split narration text into caption-sized chunks.
///
/// Whitespace is collapsed first. Empty or whitespace-only input yields a
/// single chunk carrying the original text — never an empty list.
pub fn split_text(text: &str, limits: &SubtitleLimits) -> Vec<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in SENTENCE_RE.find_iter(&collapsed) {
        let sentence = sentence.as_str().trim();
        if sentence.is_empty() {
            continue;
        }

        let candidate = if current.is_empty() {
            sentence.to_string()
        } else {
            format!("{current} {sentence}")
        };
        if fits(&candidate, limits) {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if fits(sentence, limits) {
            current = sentence.to_string();
        } else {
            chunks.extend(split_long_sentence(sentence, limits.max_chars_per_line));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    if chunks.is_empty() {
        vec![collapsed]
    } else {
        chunks
    }
}

/// Whether `text`, word-wrapped at the line width, fits the line count.
fn fits(text: &str, limits: &SubtitleLimits) -> bool {
    let lines = wrap_text(text, limits.max_chars_per_line);
    lines.len() <= limits.max_lines
        && lines
            .iter()
            .all(|l| l.chars().count() <= limits.max_chars_per_line)
}

/// Greedy word wrap. A single word longer than the width becomes its own
/// (over-wide) line rather than being broken mid-word.
pub fn wrap_text(text: &str, max_chars_per_line: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate_len = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if candidate_len <= max_chars_per_line {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Force-split an over-long sentence into line-width chunks at word
/// boundaries, keeping words intact.
fn split_long_sentence(sentence: &str, max_chars_per_line: usize) -> Vec<String> {
    wrap_text(sentence, max_chars_per_line)
}

// ---------------------------------------------------------------------------
// SRT rendering
// ---------------------------------------------------------------------------

/// Render subtitle entries as SRT document text.
pub fn render_srt(entries: &[SubtitleEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            entry.index,
            format_srt_time(entry.start_time),
            format_srt_time(entry.end_time),
            entry.text
        ));
    }
    out
}

/// Format seconds as an SRT timestamp, `HH:MM:SS,mmm`.
pub fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}
