//! Provider configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use kolscore_core::traits::ChatModel;

use crate::openai::OpenAiChat;

/// Settings for the OpenAI-compatible backend.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure
/// in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiSettings {
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

impl std::fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Top-level kolscore configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KolscoreConfig {
    /// Chat model backend settings.
    #[serde(default)]
    pub openai: Option<OpenAiSettings>,
    /// Upper bound on concurrent chat requests across all evaluators.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    /// Directory for reports and normalization state.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_max_concurrent() -> usize {
    10
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./outputs")
}

impl Default for KolscoreConfig {
    fn default() -> Self {
        Self {
            openai: None,
            max_concurrent_requests: default_max_concurrent(),
            output_dir: default_output_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `kolscore.toml` in the current directory
/// 2. `~/.config/kolscore/config.toml`
///
/// Environment variable overrides: `KOLSCORE_OPENAI_KEY`, `OPENAI_API_KEY`.
pub fn load_config() -> Result<KolscoreConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<KolscoreConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("kolscore.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<KolscoreConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => KolscoreConfig::default(),
    };

    // Apply env var overrides
    let env_key = std::env::var("KOLSCORE_OPENAI_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok();
    if let Some(key) = env_key {
        match config.openai.as_mut() {
            Some(settings) => settings.api_key = key,
            None => {
                config.openai = Some(OpenAiSettings {
                    api_key: key,
                    base_url: None,
                    model: default_model(),
                });
            }
        }
    }

    // Resolve env vars inside settings
    if let Some(settings) = config.openai.as_mut() {
        settings.api_key = resolve_env_vars(&settings.api_key);
        settings.base_url = settings.base_url.as_ref().map(|u| resolve_env_vars(u));
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("kolscore"))
}

/// Create a chat model from the configuration.
pub fn create_chat_model(config: &KolscoreConfig) -> Result<Arc<dyn ChatModel>> {
    let settings = config
        .openai
        .as_ref()
        .context("no chat backend configured; add an [openai] section or set OPENAI_API_KEY")?;
    anyhow::ensure!(!settings.api_key.is_empty(), "OpenAI API key is empty");
    Ok(Arc::new(OpenAiChat::new(
        &settings.api_key,
        settings.base_url.clone(),
        settings.model.clone(),
        config.max_concurrent_requests,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_KOLSCORE_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_KOLSCORE_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_KOLSCORE_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_KOLSCORE_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = KolscoreConfig::default();
        assert!(config.openai.is_none());
        assert_eq!(config.max_concurrent_requests, 10);
        assert_eq!(config.output_dir, PathBuf::from("./outputs"));
    }

    #[test]
    fn parse_config_toml() {
        let toml_str = r#"
max_concurrent_requests = 5
output_dir = "results"

[openai]
api_key = "sk-test"
model = "gpt-4o"
"#;
        let config: KolscoreConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.max_concurrent_requests, 5);
        let settings = config.openai.unwrap();
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.model, "gpt-4o");
    }

    #[test]
    fn debug_masks_api_key() {
        let settings = OpenAiSettings {
            api_key: "sk-secret".into(),
            base_url: None,
            model: default_model(),
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn create_chat_model_requires_key() {
        let config = KolscoreConfig::default();
        assert!(create_chat_model(&config).is_err());

        let config = KolscoreConfig {
            openai: Some(OpenAiSettings {
                api_key: "sk-test".into(),
                base_url: None,
                model: default_model(),
            }),
            ..KolscoreConfig::default()
        };
        assert!(create_chat_model(&config).is_ok());
    }
}
