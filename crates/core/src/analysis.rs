//! Product analysis results produced by the analysis stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A single product feature surfaced by the analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductFeature {
    pub name: String,
    pub description: String,
    /// Importance score, 1 (minor) to 10 (flagship).
    pub importance: u8,
    /// Whether the feature is worth showing in the demo.
    pub demo_worthy: bool,
}

impl ProductFeature {
    /// Validate the importance score range.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(1..=10).contains(&self.importance) {
            return Err(CoreError::Validation(format!(
                "Feature '{}' importance must be 1-10, got {}",
                self.name, self.importance
            )));
        }
        Ok(())
    }
}

/// Structured product knowledge extracted from source references.
///
/// Input to the script stage; cached as the analyze stage payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub product_name: String,
    pub tagline: String,
    pub category: String,
    #[serde(default)]
    pub target_users: Vec<String>,
    #[serde(default)]
    pub key_features: Vec<ProductFeature>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default)]
    pub competitive_advantage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    /// Candidate URLs worth capturing for the demo.
    #[serde(default)]
    pub demo_urls: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Features flagged as worth showing, in declaration order.
    pub fn demo_worthy_features(&self) -> Vec<&ProductFeature> {
        self.key_features.iter().filter(|f| f.demo_worthy).collect()
    }
}
