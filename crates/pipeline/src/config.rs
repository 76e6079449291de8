//! Pipeline configuration.
//!
//! Explicitly constructed and passed by reference — there is no implicit
//! global configuration. All fields have defaults suitable for local use;
//! `from_env` overrides them from environment variables, honoring a `.env`
//! file when one exists.

use std::path::PathBuf;
use std::time::Duration;

use reelsmith_core::duration::SPEAKING_RATE_NORMAL;
use reelsmith_core::subtitles::SubtitleLimits;
use reelsmith_core::transitions::{TransitionConfig, TransitionKind};

/// Configuration for the pipeline orchestrator and its components.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory for the stage output cache.
    pub cache_dir: PathBuf,
    /// Root directory for rendered videos and persisted project state.
    pub output_dir: PathBuf,
    /// Whether stage outputs are cached at all.
    pub enable_caching: bool,
    /// Time-to-live for cache entries.
    pub cache_ttl: Duration,
    /// Concurrency window for scene visual capture (>= 1).
    pub parallel_captures: usize,
    /// Transition kind and duration used between scenes.
    pub transition: TransitionConfig,
    /// Caption layout constraints.
    pub subtitles: SubtitleLimits,
    /// Speaking rate used for narration budgeting (words per minute).
    pub words_per_minute: u32,
    /// Maximum script generation attempts before accepting the closest fit.
    pub script_max_attempts: u32,
    /// Upper bound on the requested video length, in seconds.
    pub max_video_length_seconds: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache"),
            output_dir: PathBuf::from("./output"),
            enable_caching: true,
            cache_ttl: Duration::from_secs(72 * 3600),
            parallel_captures: 3,
            transition: TransitionConfig::default(),
            subtitles: SubtitleLimits::default(),
            words_per_minute: SPEAKING_RATE_NORMAL,
            script_max_attempts: 3,
            max_video_length_seconds: 300,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default    |
    /// |------------------------------|------------|
    /// | `CACHE_DIR`                  | `./cache`  |
    /// | `OUTPUT_DIR`                 | `./output` |
    /// | `ENABLE_CACHING`             | `true`     |
    /// | `CACHE_TTL_HOURS`            | `72`       |
    /// | `PARALLEL_CAPTURES`          | `3`        |
    /// | `TRANSITION_KIND`            | `fade`     |
    /// | `TRANSITION_DURATION_SECS`   | `1.0`      |
    /// | `SUBTITLE_MAX_CHARS_PER_LINE`| `42`       |
    /// | `SUBTITLE_MAX_LINES`         | `2`        |
    /// | `WORDS_PER_MINUTE`           | `150`      |
    /// | `SCRIPT_MAX_ATTEMPTS`        | `3`        |
    /// | `MAX_VIDEO_LENGTH_SECS`      | `300`      |
    ///
    /// A `.env` file in the working directory is honored when present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let cache_dir = std::env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);
        let output_dir = std::env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let enable_caching: bool = std::env::var("ENABLE_CACHING")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("ENABLE_CACHING must be true or false");

        let cache_ttl_hours: u64 = std::env::var("CACHE_TTL_HOURS")
            .unwrap_or_else(|_| "72".into())
            .parse()
            .expect("CACHE_TTL_HOURS must be a valid u64");

        let parallel_captures: usize = std::env::var("PARALLEL_CAPTURES")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("PARALLEL_CAPTURES must be a valid usize");

        let transition_kind = std::env::var("TRANSITION_KIND")
            .map(|raw| {
                serde_json::from_value::<TransitionKind>(serde_json::Value::String(raw.clone()))
                    .unwrap_or_else(|_| panic!("TRANSITION_KIND '{raw}' is not a known transition"))
            })
            .unwrap_or(defaults.transition.kind);

        let transition_duration: f64 = std::env::var("TRANSITION_DURATION_SECS")
            .unwrap_or_else(|_| "1.0".into())
            .parse()
            .expect("TRANSITION_DURATION_SECS must be a valid f64");

        let max_chars_per_line: usize = std::env::var("SUBTITLE_MAX_CHARS_PER_LINE")
            .unwrap_or_else(|_| "42".into())
            .parse()
            .expect("SUBTITLE_MAX_CHARS_PER_LINE must be a valid usize");

        let max_lines: usize = std::env::var("SUBTITLE_MAX_LINES")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("SUBTITLE_MAX_LINES must be a valid usize");

        let words_per_minute: u32 = std::env::var("WORDS_PER_MINUTE")
            .unwrap_or_else(|_| SPEAKING_RATE_NORMAL.to_string())
            .parse()
            .expect("WORDS_PER_MINUTE must be a valid u32");

        let script_max_attempts: u32 = std::env::var("SCRIPT_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("SCRIPT_MAX_ATTEMPTS must be a valid u32");

        let max_video_length_seconds: u32 = std::env::var("MAX_VIDEO_LENGTH_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("MAX_VIDEO_LENGTH_SECS must be a valid u32");

        Self {
            cache_dir,
            output_dir,
            enable_caching,
            cache_ttl: Duration::from_secs(cache_ttl_hours * 3600),
            parallel_captures: parallel_captures.max(1),
            transition: TransitionConfig {
                kind: transition_kind,
                duration: transition_duration,
            },
            subtitles: SubtitleLimits {
                max_chars_per_line,
                max_lines,
            },
            words_per_minute,
            script_max_attempts: script_max_attempts.max(1),
            max_video_length_seconds,
        }
    }
}
