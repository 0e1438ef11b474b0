//! Cross-run normalization state.
//!
//! The manager owns two JSON artifacts under a base directory:
//!
//! - `normalization_params.json` — per-leaf `{min, max}` used to rescale raw
//!   scores into [0, 1], kept stable across runs so scores stay comparable.
//! - `raw_scores_history.json` — latest raw score per `{identity, leaf}`.
//!   Last write wins per identity; this is a snapshot store, not a log.
//!
//! Parameters evolve only through the explicit
//! [`NormalizationManager::update_params_from_history`] operation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Min/max rescaling parameters for one leaf.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationRange {
    pub min: f64,
    pub max: f64,
}

impl NormalizationRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True when the range carries no information (`max == min`).
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }
}

const PARAMS_FILE: &str = "normalization_params.json";
const HISTORY_FILE: &str = "raw_scores_history.json";

/// Owns the persisted normalization state and decides, per leaf, which
/// parameters apply.
#[derive(Debug)]
pub struct NormalizationManager {
    params_path: PathBuf,
    history_path: PathBuf,
    params: HashMap<String, NormalizationRange>,
    history: HashMap<String, HashMap<String, f64>>,
}

impl NormalizationManager {
    /// Create a manager rooted at `base_dir`. Nothing is read from disk
    /// until [`load_params`](Self::load_params) /
    /// [`load_history`](Self::load_history) are called.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let base = base_dir.as_ref();
        Self {
            params_path: base.join(PARAMS_FILE),
            history_path: base.join(HISTORY_FILE),
            params: HashMap::new(),
            history: HashMap::new(),
        }
    }

    pub fn params_path(&self) -> &Path {
        &self.params_path
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    /// Currently loaded per-leaf parameters.
    pub fn params(&self) -> &HashMap<String, NormalizationRange> {
        &self.params
    }

    /// Currently loaded raw-score history.
    pub fn history(&self) -> &HashMap<String, HashMap<String, f64>> {
        &self.history
    }

    /// Parameters for one leaf, if persisted ones exist.
    pub fn range(&self, leaf_key: &str) -> Option<NormalizationRange> {
        self.params.get(leaf_key).copied()
    }

    /// Seed parameters for a leaf directly (primarily for tests and
    /// programmatic setups that bypass the params file).
    pub fn insert_range(&mut self, leaf_key: impl Into<String>, range: NormalizationRange) {
        self.params.insert(leaf_key.into(), range);
    }

    /// Load persisted parameters. A missing file is not an error: the engine
    /// falls back to batch-derived parameters for every leaf.
    ///
    /// Accepts either a bare `{leaf_key: {min, max}}` map or the same map
    /// wrapped in a `normalization_params` envelope.
    pub fn load_params(&mut self) -> Result<()> {
        if !self.params_path.exists() {
            tracing::warn!(
                path = %self.params_path.display(),
                "normalization params file not found; deriving from current batch"
            );
            self.params.clear();
            return Ok(());
        }
        let content = std::fs::read_to_string(&self.params_path).with_context(|| {
            format!("failed to read {}", self.params_path.display())
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&content).context("failed to parse normalization params JSON")?;
        let params_value = match value.get("normalization_params") {
            Some(inner) => inner.clone(),
            None => value,
        };
        self.params = serde_json::from_value(params_value)
            .context("normalization params JSON has unexpected shape")?;
        tracing::info!(
            leaves = self.params.len(),
            path = %self.params_path.display(),
            "loaded normalization params"
        );
        Ok(())
    }

    /// Persist the current parameters.
    pub fn save_params(&self) -> Result<()> {
        if let Some(parent) = self.params_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.params)
            .context("failed to serialize normalization params")?;
        std::fs::write(&self.params_path, json).with_context(|| {
            format!("failed to write {}", self.params_path.display())
        })?;
        Ok(())
    }

    /// Load the raw-score history. A missing file yields an empty history.
    ///
    /// A legacy layout keyed by leaf (`{leaf_key: [scores]}`) carries no
    /// identity information and is discarded with a warning.
    pub fn load_history(&mut self) -> Result<()> {
        if !self.history_path.exists() {
            self.history.clear();
            return Ok(());
        }
        let content = std::fs::read_to_string(&self.history_path).with_context(|| {
            format!("failed to read {}", self.history_path.display())
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&content).context("failed to parse raw score history JSON")?;

        let is_legacy = value
            .as_object()
            .and_then(|map| map.values().next())
            .map(|first| first.is_array())
            .unwrap_or(false);
        if is_legacy {
            tracing::warn!(
                path = %self.history_path.display(),
                "legacy per-leaf history format has no identities; starting fresh"
            );
            self.history.clear();
            return Ok(());
        }

        self.history =
            serde_json::from_value(value).context("raw score history JSON has unexpected shape")?;
        tracing::info!(identities = self.history.len(), "loaded raw score history");
        Ok(())
    }

    /// Merge a batch of raw leaf scores into the history and persist it.
    ///
    /// `raw_scores` maps leaf key to a score vector aligned with
    /// `identities`; an existing entry for an identity is overwritten leaf
    /// by leaf.
    pub fn record_history(
        &mut self,
        raw_scores: &HashMap<String, Vec<f64>>,
        identities: &[String],
    ) -> Result<()> {
        self.load_history()?;

        let mut updated = 0usize;
        let mut added = 0usize;
        for (idx, identity) in identities.iter().enumerate() {
            if self.history.contains_key(identity) {
                updated += 1;
            } else {
                added += 1;
            }
            let entry = self.history.entry(identity.clone()).or_default();
            for (leaf_key, scores) in raw_scores {
                if let Some(score) = scores.get(idx) {
                    entry.insert(leaf_key.clone(), *score);
                }
            }
        }

        if let Some(parent) = self.history_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.history)
            .context("failed to serialize raw score history")?;
        std::fs::write(&self.history_path, json).with_context(|| {
            format!("failed to write {}", self.history_path.display())
        })?;
        tracing::info!(
            total = self.history.len(),
            updated,
            added,
            "recorded raw scores to history"
        );
        Ok(())
    }

    /// Recompute per-leaf min/max from the full accumulated history and
    /// persist the result. This is how parameters evolve as more accounts
    /// are scored. Call [`load_history`](Self::load_history) first.
    pub fn update_params_from_history(&mut self) -> Result<()> {
        if self.history.is_empty() {
            tracing::warn!("no raw score history; normalization params left unchanged");
            return Ok(());
        }

        let mut scores_by_leaf: HashMap<&str, Vec<f64>> = HashMap::new();
        for per_leaf in self.history.values() {
            for (leaf_key, score) in per_leaf {
                scores_by_leaf.entry(leaf_key).or_default().push(*score);
            }
        }

        let mut updated = HashMap::new();
        for (leaf_key, scores) in scores_by_leaf {
            let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
            let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            tracing::info!(
                leaf = leaf_key,
                min,
                max,
                points = scores.len(),
                "updated normalization range"
            );
            updated.insert(leaf_key.to_string(), NormalizationRange::new(min, max));
        }

        self.params = updated;
        self.save_params()
    }

    /// Normalize a raw score with the persisted parameters for `leaf_key`,
    /// clamped to [0, 1]. A degenerate range yields 0.0; without parameters
    /// the raw score passes through.
    pub fn normalize(&self, leaf_key: &str, raw: f64) -> f64 {
        let Some(range) = self.params.get(leaf_key) else {
            return raw;
        };
        if range.is_degenerate() {
            return 0.0;
        }
        ((raw - range.min) / (range.max - range.min)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(leaf: &str, scores: &[f64]) -> HashMap<String, Vec<f64>> {
        let mut map = HashMap::new();
        map.insert(leaf.to_string(), scores.to_vec());
        map
    }

    #[test]
    fn missing_params_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = NormalizationManager::new(dir.path());
        manager.load_params().unwrap();
        assert!(manager.params().is_empty());
    }

    #[test]
    fn params_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = NormalizationManager::new(dir.path());
        manager.insert_range("views", NormalizationRange::new(1.0, 9.0));
        manager.save_params().unwrap();

        let mut reloaded = NormalizationManager::new(dir.path());
        reloaded.load_params().unwrap();
        assert_eq!(reloaded.range("views"), Some(NormalizationRange::new(1.0, 9.0)));
    }

    #[test]
    fn params_envelope_format_accepted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PARAMS_FILE),
            r#"{"normalization_params": {"views": {"min": 0.0, "max": 2.0}}}"#,
        )
        .unwrap();
        let mut manager = NormalizationManager::new(dir.path());
        manager.load_params().unwrap();
        assert_eq!(manager.range("views"), Some(NormalizationRange::new(0.0, 2.0)));
    }

    #[test]
    fn normalize_clamps_to_unit_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = NormalizationManager::new(dir.path());
        manager.insert_range("views", NormalizationRange::new(0.0, 2.0));
        assert_eq!(manager.normalize("views", 3.0), 1.0);
        assert_eq!(manager.normalize("views", -1.0), 0.0);
        assert_eq!(manager.normalize("views", 1.0), 0.5);
    }

    #[test]
    fn normalize_degenerate_range_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = NormalizationManager::new(dir.path());
        manager.insert_range("views", NormalizationRange::new(5.0, 5.0));
        assert_eq!(manager.normalize("views", 5.0), 0.0);
        assert_eq!(manager.normalize("views", 7.0), 0.0);
    }

    #[test]
    fn normalize_without_params_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NormalizationManager::new(dir.path());
        assert_eq!(manager.normalize("views", 0.42), 0.42);
    }

    #[test]
    fn history_overwrites_per_identity() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = NormalizationManager::new(dir.path());

        let identities = vec!["alice".to_string()];
        manager.record_history(&batch("views", &[3.0]), &identities).unwrap();
        manager.record_history(&batch("views", &[8.0]), &identities).unwrap();

        let mut reloaded = NormalizationManager::new(dir.path());
        reloaded.load_history().unwrap();
        assert_eq!(reloaded.history().len(), 1);
        assert_eq!(reloaded.history()["alice"]["views"], 8.0);
    }

    #[test]
    fn history_accumulates_across_identities() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = NormalizationManager::new(dir.path());

        manager
            .record_history(&batch("views", &[3.0]), &["alice".to_string()])
            .unwrap();
        manager
            .record_history(&batch("views", &[9.0]), &["bob".to_string()])
            .unwrap();

        let mut reloaded = NormalizationManager::new(dir.path());
        reloaded.load_history().unwrap();
        assert_eq!(reloaded.history().len(), 2);
    }

    #[test]
    fn legacy_history_format_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(HISTORY_FILE),
            r#"{"views": [1.0, 2.0, 3.0]}"#,
        )
        .unwrap();
        let mut manager = NormalizationManager::new(dir.path());
        manager.load_history().unwrap();
        assert!(manager.history().is_empty());
    }

    #[test]
    fn update_params_from_history_recomputes_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = NormalizationManager::new(dir.path());
        manager
            .record_history(&batch("views", &[2.0]), &["alice".to_string()])
            .unwrap();
        manager
            .record_history(&batch("views", &[10.0]), &["bob".to_string()])
            .unwrap();

        manager.update_params_from_history().unwrap();
        assert_eq!(manager.range("views"), Some(NormalizationRange::new(2.0, 10.0)));

        // Persisted too.
        let mut reloaded = NormalizationManager::new(dir.path());
        reloaded.load_params().unwrap();
        assert_eq!(reloaded.range("views"), Some(NormalizationRange::new(2.0, 10.0)));
    }

    #[test]
    fn update_params_with_empty_history_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = NormalizationManager::new(dir.path());
        manager.insert_range("views", NormalizationRange::new(0.0, 1.0));
        manager.update_params_from_history().unwrap();
        assert_eq!(manager.range("views"), Some(NormalizationRange::new(0.0, 1.0)));
        assert!(!manager.params_path().exists());
    }
}
