//! Structural error types.
//!
//! Tree errors indicate a contract violation by the caller and are the only
//! errors the engine propagates out of a scoring run; per-evaluation failures
//! are degraded in place instead.

use thiserror::Error;

/// Structural problems in a scoring tree.
#[derive(Debug, Error)]
pub enum TreeError {
    /// Two nodes share the same key.
    #[error("duplicate node key: {0}")]
    DuplicateKey(String),

    /// A leaf node has no evaluator attached.
    #[error("leaf node '{0}' has no evaluator")]
    LeafWithoutEvaluator(String),
}
