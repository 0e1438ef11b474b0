//! The hierarchical scoring tree.
//!
//! A [`ScoreNode`] is pure definition: weights, descriptions, an evaluator
//! capability on leaves, and a combination rule on branches. The tree carries
//! no run state and is read-only during aggregation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::traits::LeafEvaluator;

/// How a branch node combines its children's scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    /// Weighted average over children, with sibling weights normalized to
    /// sum to one.
    #[default]
    WeightedAverage,
    /// Product of exactly two children's scores. Encodes a multiplicative
    /// gate: a poor factor caps the result regardless of the other. Falls
    /// back to the weighted average when the node does not have exactly two
    /// children.
    Product,
}

/// A node in the scoring tree.
///
/// A node is a leaf iff it has no children. Leaves carry an evaluator and a
/// `normalize` flag; branches carry a [`Combinator`]. Keys must be unique
/// across the whole tree — [`ScoreNode::validate`] enforces this.
#[derive(Clone)]
pub struct ScoreNode {
    /// Globally unique identity, e.g. `"content_depth"`.
    pub key: String,
    /// Display label.
    pub name: String,
    /// Weight relative to siblings (meaningless on the root).
    pub weight: f64,
    /// Human-readable description of what the node measures.
    pub description: String,
    /// Child nodes; empty for leaves.
    pub children: Vec<ScoreNode>,
    /// Evaluator capability; required on leaves, ignored on branches.
    pub evaluator: Option<Arc<dyn LeafEvaluator>>,
    /// Whether raw leaf scores are min/max normalized. Leaves with
    /// `normalize = false` must already produce calibrated [0, 1] values.
    pub normalize: bool,
    /// Combination rule for branch nodes.
    pub combinator: Combinator,
}

impl std::fmt::Debug for ScoreNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreNode")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("weight", &self.weight)
            .field("normalize", &self.normalize)
            .field("combinator", &self.combinator)
            .field("evaluator", &self.evaluator.is_some())
            .field("children", &self.children)
            .finish()
    }
}

impl ScoreNode {
    /// Create a leaf node with the given evaluator. Defaults: weight 1.0,
    /// normalization on.
    pub fn leaf(
        key: impl Into<String>,
        name: impl Into<String>,
        evaluator: Arc<dyn LeafEvaluator>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            weight: 1.0,
            description: String::new(),
            children: Vec::new(),
            evaluator: Some(evaluator),
            normalize: true,
            combinator: Combinator::default(),
        }
    }

    /// Create a branch node over the given children. Defaults: weight 1.0,
    /// weighted-average combination.
    pub fn branch(
        key: impl Into<String>,
        name: impl Into<String>,
        children: Vec<ScoreNode>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            weight: 1.0,
            description: String::new(),
            children,
            evaluator: None,
            normalize: true,
            combinator: Combinator::default(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    /// Mark a leaf as pre-calibrated: its raw scores pass through without
    /// min/max normalization.
    pub fn raw(mut self) -> Self {
        self.normalize = false;
        self
    }

    /// True iff this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Validate structural invariants: unique keys across the whole tree and
    /// an evaluator on every leaf. Iterative so validation cost does not
    /// depend on stack depth.
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if !seen.insert(&node.key) {
                return Err(TreeError::DuplicateKey(node.key.clone()));
            }
            if node.is_leaf() && node.evaluator.is_none() {
                return Err(TreeError::LeafWithoutEvaluator(node.key.clone()));
            }
            stack.extend(node.children.iter());
        }
        Ok(())
    }

    /// The evaluator-free, data-only form of this tree. This is what gets
    /// persisted so downstream consumers know the shape of the score and
    /// comment maps without re-deriving it from code.
    pub fn structure(&self) -> TreeStructure {
        TreeStructure {
            key: self.key.clone(),
            name: self.name.clone(),
            weight: self.weight,
            description: self.description.clone(),
            is_leaf: self.is_leaf(),
            normalize: self.normalize,
            combinator: self.combinator,
            children: self.children.iter().map(|c| c.structure()).collect(),
        }
    }
}

/// Serializable description of a scoring tree, minus the evaluators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeStructure {
    pub key: String,
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub description: String,
    pub is_leaf: bool,
    pub normalize: bool,
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub children: Vec<TreeStructure>,
}

impl TreeStructure {
    /// Save the structure as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize tree structure")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write tree structure to {}", path.display()))?;
        Ok(())
    }

    /// Load a structure from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tree structure from {}", path.display()))?;
        let structure =
            serde_json::from_str(&content).context("failed to parse tree structure JSON")?;
        Ok(structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Evaluation, FnEvaluator};

    fn dummy_leaf(key: &str) -> ScoreNode {
        ScoreNode::leaf(key, key, Arc::new(FnEvaluator::new(|_| Evaluation::from(0.0))))
    }

    #[test]
    fn leaf_iff_no_children() {
        let leaf = dummy_leaf("a");
        assert!(leaf.is_leaf());
        let branch = ScoreNode::branch("b", "B", vec![dummy_leaf("a")]);
        assert!(!branch.is_leaf());
    }

    #[test]
    fn validate_accepts_well_formed_tree() {
        let root = ScoreNode::branch(
            "root",
            "Root",
            vec![
                ScoreNode::branch("inner", "Inner", vec![dummy_leaf("a"), dummy_leaf("b")]),
                dummy_leaf("c"),
            ],
        );
        assert!(root.validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_keys() {
        let root = ScoreNode::branch("root", "Root", vec![dummy_leaf("a"), dummy_leaf("a")]);
        match root.validate() {
            Err(TreeError::DuplicateKey(key)) => assert_eq!(key, "a"),
            other => panic!("expected DuplicateKey, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_leaf_without_evaluator() {
        let bare = ScoreNode::branch("root", "Root", vec![]);
        // A branch constructor with no children yields a leaf with no evaluator.
        match bare.validate() {
            Err(TreeError::LeafWithoutEvaluator(key)) => assert_eq!(key, "root"),
            other => panic!("expected LeafWithoutEvaluator, got {other:?}"),
        }
    }

    #[test]
    fn structure_roundtrip_preserves_shape() {
        let root = ScoreNode::branch(
            "root",
            "Root",
            vec![
                ScoreNode::branch(
                    "quality",
                    "Quality",
                    vec![dummy_leaf("a").with_weight(2.0), dummy_leaf("b")],
                ),
                dummy_leaf("gate").raw(),
            ],
        )
        .with_combinator(Combinator::Product);

        let structure = root.structure();
        let json = serde_json::to_string(&structure).unwrap();
        let reloaded: TreeStructure = serde_json::from_str(&json).unwrap();

        assert_eq!(reloaded.key, "root");
        assert_eq!(reloaded.combinator, Combinator::Product);
        assert!(!reloaded.is_leaf);
        assert_eq!(reloaded.children.len(), 2);

        let quality = &reloaded.children[0];
        assert_eq!(quality.children[0].key, "a");
        assert_eq!(quality.children[0].weight, 2.0);
        assert!(quality.children[0].is_leaf);
        assert!(quality.children[0].normalize);

        let gate = &reloaded.children[1];
        assert_eq!(gate.key, "gate");
        assert!(!gate.normalize);
    }

    #[test]
    fn structure_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree_structure.json");
        let root = ScoreNode::branch("root", "Root", vec![dummy_leaf("a")]);

        root.structure().save_json(&path).unwrap();
        let loaded = TreeStructure::load_json(&path).unwrap();
        assert_eq!(loaded.key, "root");
        assert_eq!(loaded.children.len(), 1);
    }
}
