//! Demo script data model: audience, scenes, and the generated script.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Target audience for the generated demo video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Investor,
    Customer,
    #[default]
    Developer,
    Technical,
}

impl Audience {
    /// Stable wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Investor => "investor",
            Audience::Customer => "customer",
            Audience::Developer => "developer",
            Audience::Technical => "technical",
        }
    }
}

/// Kind of visual content a scene carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Live webpage screenshot; requires a source URL.
    Screenshot,
    /// Text-only rendered title card.
    TitleCard,
    /// Rendered code example.
    CodeSnippet,
    /// Architecture or flow diagram.
    Diagram,
}

/// A single timed unit of the output video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Unique within a script.
    pub id: String,
    pub kind: SceneKind,
    /// Voiceover narration text for this scene.
    pub narration: String,
    pub duration_seconds: f64,
    /// URL to capture; required when `kind` is [`SceneKind::Screenshot`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Static text content for title cards, code snippets, and diagrams.
    #[serde(default)]
    pub visual_content: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Scene {
    /// Build a title-card scene, used for intro and outro slots.
    pub fn title_card(id: impl Into<String>, text: impl Into<String>, duration_seconds: f64) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            kind: SceneKind::TitleCard,
            narration: text.clone(),
            duration_seconds,
            url: None,
            visual_content: text,
            metadata: HashMap::new(),
        }
    }

    /// Validate scene invariants: positive duration, non-empty narration,
    /// and a source URL when the scene is a screenshot.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.duration_seconds <= 0.0 {
            return Err(CoreError::Validation(format!(
                "Scene '{}' duration must be > 0, got {}",
                self.id, self.duration_seconds
            )));
        }
        if self.narration.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "Scene '{}' must have narration text",
                self.id
            )));
        }
        if self.kind == SceneKind::Screenshot && self.url.is_none() {
            return Err(CoreError::Validation(format!(
                "Screenshot scene '{}' requires a source URL",
                self.id
            )));
        }
        Ok(())
    }
}

/// Complete generated demo script: intro narration, ordered scenes, outro.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoScript {
    pub title: String,
    pub audience: Audience,
    /// Target total video length in seconds.
    pub total_duration: f64,
    pub scenes: Vec<Scene>,
    /// Opening narration, rendered as a title card.
    pub intro: String,
    /// Closing narration, rendered as a title card.
    pub outro: String,
    #[serde(default)]
    pub call_to_action: String,
    pub generated_at: DateTime<Utc>,
}

impl DemoScript {
    /// Total word count across intro, scene narrations, and outro.
    pub fn total_words(&self) -> usize {
        self.intro.split_whitespace().count()
            + self.outro.split_whitespace().count()
            + self
                .scenes
                .iter()
                .map(|s| s.narration.split_whitespace().count())
                .sum::<usize>()
    }

    /// Narration segments in document order: intro (when present), every
    /// scene, outro (when present). Each entry is `(segment_id, text)`.
    pub fn narrations(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(self.scenes.len() + 2);
        if !self.intro.trim().is_empty() {
            out.push(("intro".to_string(), self.intro.clone()));
        }
        for scene in &self.scenes {
            out.push((scene.id.clone(), scene.narration.clone()));
        }
        if !self.outro.trim().is_empty() {
            out.push(("outro".to_string(), self.outro.clone()));
        }
        out
    }

    /// Validate the script: at least one scene, unique scene ids, and each
    /// scene's own invariants.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.scenes.is_empty() {
            return Err(CoreError::Validation(
                "Script must contain at least one scene".to_string(),
            ));
        }
        if self.total_duration <= 0.0 {
            return Err(CoreError::Validation(format!(
                "Script total duration must be > 0, got {}",
                self.total_duration
            )));
        }
        let mut seen = std::collections::HashSet::with_capacity(self.scenes.len());
        for scene in &self.scenes {
            scene.validate()?;
            if !seen.insert(scene.id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Duplicate scene id: \"{}\"",
                    scene.id
                )));
            }
        }
        Ok(())
    }
}
