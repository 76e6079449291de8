//! Deterministic cache-key computation over a run's logical inputs.
//!
//! Two runs with the same source references, audience, and target duration
//! share the same key and therefore the same per-stage cache entries.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::script::Audience;

/// SHA-256 fingerprint (64 lowercase hex chars) of a run's logical inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key from the input set.
    ///
    /// Fields are fed to the hasher in a fixed order with explicit framing
    /// (presence tag + length prefix), so the result depends only on the
    /// values themselves — never on how the caller assembled them — and
    /// `None` is distinct from an empty string.
    pub fn compute(
        repo_url: Option<&str>,
        website_url: Option<&str>,
        audience: Audience,
        target_duration_seconds: u32,
    ) -> Self {
        let mut hasher = Sha256::new();
        hash_opt_str(&mut hasher, repo_url);
        hash_opt_str(&mut hasher, website_url);
        hash_str(&mut hasher, audience.as_str());
        hasher.update(target_duration_seconds.to_be_bytes());
        let digest = hasher.finalize();
        Self(format!("{digest:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn hash_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

fn hash_opt_str(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hash_str(hasher, v);
        }
        None => hasher.update([0u8]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPO: &str = "https://github.com/acme/widget";

    #[test]
    fn same_inputs_same_key() {
        let a = CacheKey::compute(Some(REPO), None, Audience::Developer, 90);
        let b = CacheKey::compute(Some(REPO), None, Audience::Developer, 90);
        assert_eq!(a, b);
    }

    #[test]
    fn key_is_64_hex_chars() {
        let key = CacheKey::compute(Some(REPO), None, Audience::Developer, 90);
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_repo_changes_key() {
        let a = CacheKey::compute(Some(REPO), None, Audience::Developer, 90);
        let b = CacheKey::compute(
            Some("https://github.com/acme/other"),
            None,
            Audience::Developer,
            90,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn different_audience_changes_key() {
        let a = CacheKey::compute(Some(REPO), None, Audience::Developer, 90);
        let b = CacheKey::compute(Some(REPO), None, Audience::Investor, 90);
        assert_ne!(a, b);
    }

    #[test]
    fn different_target_duration_changes_key() {
        let a = CacheKey::compute(Some(REPO), None, Audience::Developer, 90);
        let b = CacheKey::compute(Some(REPO), None, Audience::Developer, 120);
        assert_ne!(a, b);
    }

    #[test]
    fn none_distinct_from_empty_string() {
        let a = CacheKey::compute(None, Some("https://example.com"), Audience::Developer, 90);
        let b = CacheKey::compute(Some(""), Some("https://example.com"), Audience::Developer, 90);
        assert_ne!(a, b);
    }

    #[test]
    fn field_values_do_not_bleed_across_positions() {
        // repo=Some(x), website=None must differ from repo=None, website=Some(x).
        let a = CacheKey::compute(Some(REPO), None, Audience::Developer, 90);
        let b = CacheKey::compute(None, Some(REPO), Audience::Developer, 90);
        assert_ne!(a, b);
    }

    #[test]
    fn round_trips_through_serde() {
        let key = CacheKey::compute(Some(REPO), None, Audience::Developer, 90);
        let json = serde_json::to_string(&key).unwrap();
        let back: CacheKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
