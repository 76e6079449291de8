//! Master-timeline assembly: audio placement and subtitle timing.
//!
//! Audio segments are placed back-to-back in document order (intro, scenes,
//! outro), and subtitle chunks are derived from each segment's narration
//! with the segment's duration divided evenly across its chunks.

use crate::duration::estimate_seconds;
use crate::media::{AudioSegment, SubtitleEntry};
use crate::script::DemoScript;
use crate::subtitles::{split_text, SubtitleLimits};

/// Assign cumulative start times to segments in document order.
///
/// Each segment starts where the previous one ended, so placement is
/// contiguous and non-overlapping on the master timeline.
pub fn assign_start_times(mut segments: Vec<AudioSegment>) -> Vec<AudioSegment> {
    let mut cursor = 0.0;
    for segment in &mut segments {
        segment.start_time = cursor;
        cursor += segment.duration_seconds;
    }
    segments
}

/// Derive time-bounded subtitle chunks from placed audio segments.
///
/// Indices are contiguous from 1 across the whole project. Within a
/// segment, each chunk's end coincides exactly with the next chunk's start;
/// across segment boundaries, adjacency follows the audio placement.
pub fn subtitles_from_audio(
    segments: &[AudioSegment],
    limits: &SubtitleLimits,
) -> Vec<SubtitleEntry> {
    let mut entries = Vec::new();
    let mut index = 1;

    for segment in segments {
        let chunks = split_text(&segment.text, limits);
        let chunk_duration = segment.duration_seconds / chunks.len() as f64;

        for (i, text) in chunks.into_iter().enumerate() {
            entries.push(SubtitleEntry {
                index,
                start_time: segment.start_time + i as f64 * chunk_duration,
                end_time: segment.start_time + (i + 1) as f64 * chunk_duration,
                text,
            });
            index += 1;
        }
    }

    entries
}

/// Derive subtitle chunks with estimated timings, for use before audio
/// exists. Scene chunks use the scripted scene duration; intro and outro
/// durations are estimated from word count at `words_per_minute`.
pub fn subtitles_from_script(
    script: &DemoScript,
    limits: &SubtitleLimits,
    words_per_minute: u32,
) -> Vec<SubtitleEntry> {
    let mut entries = Vec::new();
    let mut index = 1;
    let mut cursor = 0.0;

    let emit = |text: &str, duration: f64, entries: &mut Vec<SubtitleEntry>, index: &mut usize, cursor: &mut f64| {
        let chunks = split_text(text, limits);
        let chunk_duration = duration / chunks.len() as f64;
        for text in chunks {
            entries.push(SubtitleEntry {
                index: *index,
                start_time: *cursor,
                end_time: *cursor + chunk_duration,
                text,
            });
            *index += 1;
            *cursor += chunk_duration;
        }
    };

    if !script.intro.trim().is_empty() {
        let duration = estimate_seconds(&script.intro, words_per_minute);
        emit(&script.intro, duration, &mut entries, &mut index, &mut cursor);
    }
    for scene in &script.scenes {
        if scene.narration.trim().is_empty() {
            continue;
        }
        emit(
            &scene.narration,
            scene.duration_seconds,
            &mut entries,
            &mut index,
            &mut cursor,
        );
    }
    if !script.outro.trim().is_empty() {
        let duration = estimate_seconds(&script.outro, words_per_minute);
        emit(&script.outro, duration, &mut entries, &mut index, &mut cursor);
    }

    entries
}
