//! Core trait definitions for leaf evaluators, narrative generation, and
//! chat models.
//!
//! These async traits are implemented by the `kolscore-evaluators` and
//! `kolscore-providers` crates respectively.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::Account;

// ---------------------------------------------------------------------------
// Leaf evaluator trait
// ---------------------------------------------------------------------------

/// The output of a single leaf evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Raw score, in whatever scale the evaluator produces.
    pub score: f64,
    /// Free-text commentary; may be empty.
    pub comment: String,
}

impl Evaluation {
    pub fn new(score: f64, comment: impl Into<String>) -> Self {
        Self {
            score,
            comment: comment.into(),
        }
    }
}

impl From<f64> for Evaluation {
    fn from(score: f64) -> Self {
        Self {
            score,
            comment: String::new(),
        }
    }
}

impl From<(f64, String)> for Evaluation {
    fn from((score, comment): (f64, String)) -> Self {
        Self { score, comment }
    }
}

/// Trait for per-leaf scoring of a single account.
///
/// Implementations may be pure functions of the account or may suspend on
/// external I/O (e.g. an LLM judgment call); the engine invokes both through
/// the same call path. Backpressure on external calls is the evaluator's
/// responsibility — the engine issues all tasks for a leaf eagerly.
#[async_trait]
pub trait LeafEvaluator: Send + Sync {
    /// Compute the raw score and comment for one account.
    async fn evaluate(&self, account: &Account) -> anyhow::Result<Evaluation>;
}

/// Adapter that lifts a synchronous scoring function into the
/// [`LeafEvaluator`] contract so it composes with suspending evaluators.
pub struct FnEvaluator<F> {
    func: F,
}

impl<F> FnEvaluator<F>
where
    F: Fn(&Account) -> Evaluation + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> LeafEvaluator for FnEvaluator<F>
where
    F: Fn(&Account) -> Evaluation + Send + Sync,
{
    async fn evaluate(&self, account: &Account) -> anyhow::Result<Evaluation> {
        Ok((self.func)(account))
    }
}

// ---------------------------------------------------------------------------
// Narrative generator trait
// ---------------------------------------------------------------------------

/// Per-dimension entry inside an [`AccountSummary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionSummary {
    pub key: String,
    pub name: String,
    pub score: f64,
    pub comment: String,
    /// Whether `score` is a normalized [0, 1] value or a raw evaluator value.
    pub normalized: bool,
}

/// Structured per-account summary handed to the narrative generator after
/// all scores are finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub username: String,
    pub description: String,
    pub followers_count: u64,
    pub friends_count: u64,
    pub tweets_count: u64,
    /// Final root score for this account.
    pub overall_score: f64,
    /// One entry per leaf dimension.
    pub dimensions: Vec<DimensionSummary>,
}

/// Trait for free-text commentary on a finished scoring run.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Produce a narrative comment for one account's summary.
    async fn narrate(&self, summary: &AccountSummary) -> anyhow::Result<String>;
}

/// Placeholder used whenever narrative generation fails or is disabled.
pub const NARRATIVE_FALLBACK: &str = "Unable to generate summary.";

/// Narrative generator that always returns the fallback placeholder.
/// Useful for tests and narrative-free runs.
pub struct NoopNarrator;

#[async_trait]
impl NarrativeGenerator for NoopNarrator {
    async fn narrate(&self, _summary: &AccountSummary) -> anyhow::Result<String> {
        Ok(NARRATIVE_FALLBACK.to_string())
    }
}

// ---------------------------------------------------------------------------
// Chat model trait
// ---------------------------------------------------------------------------

/// Request to a chat model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user prompt.
    pub prompt: String,
    /// Optional response shape. When present, the model is instructed to
    /// reply with a JSON object matching this schema and the provider parses
    /// the body into [`ChatResponse::json`].
    #[serde(default)]
    pub json_schema: Option<serde_json::Value>,
}

impl ChatRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            json_schema: None,
        }
    }

    pub fn structured(prompt: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            prompt: prompt.into(),
            json_schema: Some(schema),
        }
    }
}

/// Response from a chat model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Raw response text.
    pub content: String,
    /// Parsed JSON object, present when the request carried a schema.
    #[serde(default)]
    pub json: Option<serde_json::Value>,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Trait for LLM backends used by judgment-based evaluators and the
/// narrative generator.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Human-readable backend name (e.g. "openai").
    fn name(&self) -> &str;

    /// Send one prompt and await the completion.
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse>;
}
