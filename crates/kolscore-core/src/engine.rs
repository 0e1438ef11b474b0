//! Central scoring orchestrator.
//!
//! Runs every `(leaf, account)` evaluation concurrently, records raw-score
//! history, applies per-leaf normalization, combines scores bottom-up
//! through the tree, and attaches a narrative comment to the root.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use uuid::Uuid;

use crate::model::Account;
use crate::normalization::{NormalizationManager, NormalizationRange};
use crate::report::ScoreReport;
use crate::traits::{
    AccountSummary, DimensionSummary, Evaluation, NarrativeGenerator, NARRATIVE_FALLBACK,
};
use crate::tree::{Combinator, ScoreNode};

/// Configuration for the scoring engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whether raw leaf scores are written to the persisted history after
    /// evaluation.
    pub save_history: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { save_history: true }
    }
}

/// The central scoring engine.
///
/// Holds no per-run state; the normalization manager is passed in per run so
/// independent engines never share hidden state.
pub struct ScoringEngine {
    narrative: Arc<dyn NarrativeGenerator>,
    config: EngineConfig,
}

/// Collect all leaves via an iterative depth-first walk.
pub fn find_leaves(root: &ScoreNode) -> Vec<&ScoreNode> {
    let mut leaves = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_leaf() {
            leaves.push(node);
        } else {
            stack.extend(node.children.iter());
        }
    }
    leaves
}

/// All nodes annotated with depth, deepest first. Descendants of a node
/// always precede it, so a bottom-up pass can visit the vector in order.
pub fn nodes_by_depth(root: &ScoreNode) -> Vec<(&ScoreNode, usize)> {
    let mut nodes = Vec::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        nodes.push((node, depth));
        for child in &node.children {
            stack.push((child, depth + 1));
        }
    }
    nodes.sort_by(|a, b| b.1.cmp(&a.1));
    nodes
}

impl ScoringEngine {
    pub fn new(narrative: Arc<dyn NarrativeGenerator>, config: EngineConfig) -> Self {
        Self { narrative, config }
    }

    /// Score a batch of accounts against a tree.
    ///
    /// Only structural contract violations (malformed tree) propagate as
    /// errors; individual evaluator and narrative failures are degraded in
    /// place and never abort the batch.
    pub async fn score(
        &self,
        accounts: &[Account],
        root: &ScoreNode,
        norm: &mut NormalizationManager,
    ) -> Result<ScoreReport> {
        root.validate()?;

        let run_id = Uuid::new_v4();
        let n = accounts.len();

        let mut raw_scores: HashMap<String, Vec<f64>> = HashMap::new();
        let mut scores: HashMap<String, Vec<f64>> = HashMap::new();
        let mut comments: HashMap<String, Vec<String>> = HashMap::new();
        let mut used_params: HashMap<String, NormalizationRange> = HashMap::new();

        if accounts.is_empty() {
            return Ok(ScoreReport {
                id: run_id,
                created_at: chrono::Utc::now(),
                raw_scores,
                normalization_params: used_params,
                scores,
                comments,
            });
        }

        // Phase 1: evaluate every (leaf, account) pair, all accounts of a
        // leaf concurrently. Results come back index-aligned with the
        // account list.
        let leaves = find_leaves(root);
        for leaf in &leaves {
            let Some(evaluator) = leaf.evaluator.as_ref() else {
                // validate() rejects this; kept as a belt for hand-built trees.
                raw_scores.insert(leaf.key.clone(), vec![0.0; n]);
                scores.insert(leaf.key.clone(), vec![0.0; n]);
                comments.insert(leaf.key.clone(), vec![String::new(); n]);
                continue;
            };

            let results: Vec<Evaluation> = join_all(accounts.iter().map(|account| {
                let leaf_key = leaf.key.as_str();
                async move {
                    match evaluator.evaluate(account).await {
                        Ok(eval) => eval,
                        Err(e) => {
                            tracing::warn!(
                                leaf = leaf_key,
                                account = %account.identity(),
                                error = format!("{e:#}"),
                                "leaf evaluation failed; scoring 0.0"
                            );
                            Evaluation::default()
                        }
                    }
                }
            }))
            .await;

            let leaf_scores: Vec<f64> = results.iter().map(|r| r.score).collect();
            let leaf_comments: Vec<String> = results.into_iter().map(|r| r.comment).collect();
            raw_scores.insert(leaf.key.clone(), leaf_scores.clone());
            scores.insert(leaf.key.clone(), leaf_scores);
            comments.insert(leaf.key.clone(), leaf_comments);
        }

        // Phase 2: capture raw scores into the cross-run history.
        if self.config.save_history {
            let identities: Vec<String> = accounts.iter().map(Account::identity).collect();
            norm.record_history(&raw_scores, &identities)?;
        }

        // Phase 3: per-leaf normalization. Persisted parameters win when
        // present (with clamping); otherwise the current batch defines the
        // range.
        for leaf in &leaves {
            if !leaf.normalize {
                continue;
            }
            let raw = &raw_scores[&leaf.key];
            if let Some(range) = norm.range(&leaf.key) {
                used_params.insert(leaf.key.clone(), range);
                let normalized = raw.iter().map(|&r| norm.normalize(&leaf.key, r)).collect();
                tracing::info!(
                    leaf = %leaf.key,
                    min = range.min,
                    max = range.max,
                    "using persisted normalization params"
                );
                scores.insert(leaf.key.clone(), normalized);
            } else {
                let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
                let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let range = NormalizationRange::new(min, max);
                used_params.insert(leaf.key.clone(), range);
                let normalized = if range.is_degenerate() {
                    vec![0.0; raw.len()]
                } else {
                    raw.iter().map(|&r| (r - min) / (max - min)).collect()
                };
                tracing::info!(
                    leaf = %leaf.key,
                    min,
                    max,
                    "derived normalization params from current batch"
                );
                scores.insert(leaf.key.clone(), normalized);
            }
        }

        // Phase 4: bottom-up combination. Deepest nodes first guarantees
        // every child is final before its parent is combined.
        let ordered = nodes_by_depth(root);
        for (node, _) in &ordered {
            raw_scores.entry(node.key.clone()).or_insert_with(|| vec![0.0; n]);
            scores.entry(node.key.clone()).or_insert_with(|| vec![0.0; n]);
            comments
                .entry(node.key.clone())
                .or_insert_with(|| vec![String::new(); n]);
        }
        for (node, _) in &ordered {
            if node.is_leaf() {
                continue;
            }
            let combined = combine_children(node, &scores, n);
            scores.insert(node.key.clone(), combined.clone());
            raw_scores.insert(node.key.clone(), combined);
        }

        // Phase 5: narrative generation for the root, one call per account,
        // all concurrent. Failures degrade to the fixed placeholder.
        let root_scores = scores[&root.key].clone();
        let summaries: Vec<AccountSummary> = accounts
            .iter()
            .enumerate()
            .map(|(idx, account)| AccountSummary {
                username: account.username.clone(),
                description: account.description.clone(),
                followers_count: account.followers_count,
                friends_count: account.friends_count,
                tweets_count: account.tweets_count,
                overall_score: root_scores[idx],
                dimensions: leaves
                    .iter()
                    .map(|leaf| DimensionSummary {
                        key: leaf.key.clone(),
                        name: leaf.name.clone(),
                        score: scores[&leaf.key][idx],
                        comment: comments[&leaf.key][idx].clone(),
                        normalized: leaf.normalize,
                    })
                    .collect(),
            })
            .collect();

        let narratives: Vec<String> = join_all(summaries.iter().map(|summary| async move {
            match self.narrative.narrate(summary).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        account = %summary.username,
                        error = format!("{e:#}"),
                        "narrative generation failed; using fallback"
                    );
                    NARRATIVE_FALLBACK.to_string()
                }
            }
        }))
        .await;
        comments.insert(root.key.clone(), narratives);

        Ok(ScoreReport {
            id: run_id,
            created_at: chrono::Utc::now(),
            raw_scores,
            normalization_params: used_params,
            scores,
            comments,
        })
    }
}

/// Combine a branch node's children per its combinator.
fn combine_children(node: &ScoreNode, scores: &HashMap<String, Vec<f64>>, n: usize) -> Vec<f64> {
    match node.combinator {
        Combinator::Product if node.children.len() == 2 => (0..n)
            .map(|idx| {
                node.children
                    .iter()
                    .map(|child| scores[&child.key][idx])
                    .product()
            })
            .collect(),
        Combinator::Product => {
            tracing::warn!(
                node = %node.key,
                children = node.children.len(),
                "product combinator expects exactly two children; using weighted average"
            );
            weighted_average(node, scores, n)
        }
        Combinator::WeightedAverage => weighted_average(node, scores, n),
    }
}

/// Weighted sum over children with sibling weights normalized to sum to 1.
/// A zero total weight degrades to an all-zero score.
fn weighted_average(node: &ScoreNode, scores: &HashMap<String, Vec<f64>>, n: usize) -> Vec<f64> {
    let total_weight: f64 = node.children.iter().map(|c| c.weight).sum();
    if total_weight <= 0.0 {
        tracing::warn!(node = %node.key, "total child weight is zero; scores degrade to 0.0");
        return vec![0.0; n];
    }
    (0..n)
        .map(|idx| {
            node.children
                .iter()
                .map(|child| scores[&child.key][idx] * (child.weight / total_weight))
                .sum()
        })
        .collect()
}
