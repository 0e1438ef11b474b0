//! kolscore-core — Scoring tree, normalization state, and aggregation engine.
//!
//! This crate defines the fundamental data model, traits, and scoring logic
//! that the entire kolscore system builds on.

pub mod engine;
pub mod error;
pub mod model;
pub mod normalization;
pub mod report;
pub mod traits;
pub mod tree;
