//! Score report types with JSON persistence.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalization::NormalizationRange;

/// The complete output of one scoring run.
///
/// The four maps are keyed by node key; each value vector is aligned 1:1
/// with the input account list. Leaves appear in `raw_scores` with their
/// true pre-normalization value; branch nodes appear with their combined
/// value, since branches are never independently normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Unique run identifier.
    pub id: Uuid,
    /// When the run completed.
    pub created_at: DateTime<Utc>,
    /// Pre-normalization value per node per account.
    pub raw_scores: HashMap<String, Vec<f64>>,
    /// Normalization parameters actually applied in this run, persisted or
    /// batch-derived.
    pub normalization_params: HashMap<String, NormalizationRange>,
    /// Final scores per node per account; the root node's entry is the
    /// overall result.
    pub scores: HashMap<String, Vec<f64>>,
    /// Comments per node per account; the root node's entry holds the
    /// generated narrative.
    pub comments: HashMap<String, Vec<String>>,
}

impl ScoreReport {
    /// Scores for one node, if present.
    pub fn scores_for(&self, node_key: &str) -> Option<&[f64]> {
        self.scores.get(node_key).map(Vec::as_slice)
    }

    /// Comments for one node, if present.
    pub fn comments_for(&self, node_key: &str) -> Option<&[String]> {
        self.comments.get(node_key).map(Vec::as_slice)
    }

    /// Save the report as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ScoreReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}
