//! kolscore-providers — Chat model backends.
//!
//! Implements the [`kolscore_core::traits::ChatModel`] trait for an
//! OpenAI-compatible API, plus a mock backend for testing, and provides the
//! configuration layer that constructs them.

pub mod config;
pub mod error;
pub mod mock;
pub mod openai;

pub use config::{create_chat_model, load_config, load_config_from, KolscoreConfig};
pub use error::ProviderError;
