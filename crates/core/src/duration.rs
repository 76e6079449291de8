//! Narration length budgeting for target-duration enforcement.
//!
//! The script stage converges on a narration word count derived from the
//! target video length and a speaking rate; a script is acceptable when
//! its total word count lands within ±10% of the target.

/// Deliberate, slow speaking rate (words per minute).
pub const SPEAKING_RATE_SLOW: u32 = 130;

/// Average speaking rate used by default.
pub const SPEAKING_RATE_NORMAL: u32 = 150;

/// Brisk speaking rate.
pub const SPEAKING_RATE_FAST: u32 = 170;

/// Acceptable deviation from the target word count, as a fraction.
const WORD_TOLERANCE: f64 = 0.1;

/// Word-count budget for a target video duration at a given speaking rate.
#[derive(Debug, Clone, Copy)]
pub struct NarrationBudget {
    target_seconds: u32,
    words_per_minute: u32,
}

impl NarrationBudget {
    pub fn new(target_seconds: u32, words_per_minute: u32) -> Self {
        Self {
            target_seconds,
            words_per_minute: words_per_minute.max(1),
        }
    }

    /// Budget at the normal speaking rate.
    pub fn normal(target_seconds: u32) -> Self {
        Self::new(target_seconds, SPEAKING_RATE_NORMAL)
    }

    /// Ideal word count for the target duration.
    pub fn target_words(&self) -> u32 {
        (self.target_seconds as f64 / 60.0 * self.words_per_minute as f64) as u32
    }

    /// Minimum acceptable word count (-10%).
    pub fn min_words(&self) -> u32 {
        (self.target_words() as f64 * (1.0 - WORD_TOLERANCE)) as u32
    }

    /// Maximum acceptable word count (+10%).
    pub fn max_words(&self) -> u32 {
        (self.target_words() as f64 * (1.0 + WORD_TOLERANCE)) as u32
    }

    /// Whether a word count is within the ±10% band.
    pub fn within_bounds(&self, word_count: usize) -> bool {
        let count = word_count as u32;
        self.min_words() <= count && count <= self.max_words()
    }

    /// Spoken duration of `word_count` words at this budget's rate.
    pub fn seconds_for_words(&self, word_count: usize) -> f64 {
        word_count as f64 / self.words_per_minute as f64 * 60.0
    }

    /// Human-readable hint for nudging a script toward the target.
    pub fn adjustment_hint(&self, word_count: usize) -> String {
        let count = word_count as u32;
        if count < self.min_words() {
            format!(
                "Script is too short: add approximately {} more words",
                self.min_words() - count
            )
        } else if count > self.max_words() {
            format!(
                "Script is too long: remove approximately {} words",
                count - self.max_words()
            )
        } else {
            "Script length is within the target bounds".to_string()
        }
    }
}

/// Estimated spoken duration of a text at a given speaking rate.
pub fn estimate_seconds(text: &str, words_per_minute: u32) -> f64 {
    let words = text.split_whitespace().count();
    words as f64 / words_per_minute.max(1) as f64 * 60.0
}
