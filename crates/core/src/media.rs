//! Captured visuals, synthesized audio segments, and subtitle entries.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A captured or rendered visual for one scene (or the intro/outro slot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualArtifact {
    /// Scene this visual belongs to (`"intro"` / `"outro"` for the edge slots).
    pub scene_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub image_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
    /// Non-fatal vision-analysis annotations (suggested highlight regions,
    /// detected text, …). Empty when the annotator is disabled or failed.
    #[serde(default)]
    pub highlights: Vec<String>,
}

fn default_voice() -> String {
    "af".to_string()
}

/// Narration audio for one scene or the intro/outro slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSegment {
    pub scene_id: String,
    /// The text that was synthesized.
    pub text: String,
    pub audio_path: PathBuf,
    pub duration_seconds: f64,
    /// Start position on the master timeline, assigned by the timeline
    /// assembler. Zero until placement.
    #[serde(default)]
    pub start_time: f64,
    #[serde(default = "default_voice")]
    pub voice_id: String,
}

/// One caption chunk in the final video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleEntry {
    /// 1-based sequence number, contiguous across the whole project.
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

impl SubtitleEntry {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.index < 1 {
            return Err(CoreError::Validation(format!(
                "Subtitle index must be >= 1, got {}",
                self.index
            )));
        }
        if self.end_time <= self.start_time {
            return Err(CoreError::Validation(format!(
                "Subtitle {} end time {} must be after start time {}",
                self.index, self.end_time, self.start_time
            )));
        }
        Ok(())
    }
}
