//! OpenAI-compatible chat completions backend.
//!
//! Concurrency toward the API is bounded by a per-client semaphore sized
//! from configuration, so the engine can issue all evaluation tasks eagerly
//! while the provider throttles the actual requests.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::instrument;

use kolscore_core::traits::{ChatModel, ChatRequest, ChatResponse};

use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI chat completions client.
pub struct OpenAiChat {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
    limiter: Arc<Semaphore>,
}

impl OpenAiChat {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        model: impl Into<String>,
        max_concurrent_requests: usize,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.into(),
            client,
            limiter: Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| anyhow::anyhow!("request limiter closed"))?;

        let start = Instant::now();

        let mut messages = vec![Message {
            role: "user".to_string(),
            content: request.prompt.clone(),
        }];
        let response_format = match &request.json_schema {
            Some(schema) => {
                messages.push(Message {
                    role: "system".to_string(),
                    content: format!(
                        "Reply with a JSON object following this structure exactly; \
                         do not add anything else, so the result parses directly:\n{}",
                        serde_json::to_string_pretty(schema)?
                    ),
                });
                Some(ResponseFormat {
                    kind: "json_object".to_string(),
                })
            }
            None => None,
        };

        let body = CompletionRequest {
            model: self.model.clone(),
            messages,
            response_format,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body).into());
        }
        if status == 404 {
            return Err(ProviderError::ModelNotFound(self.model.clone()).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::ApiError { status, message }.into());
        }

        let api_response: CompletionResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let content = api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        let json = if request.json_schema.is_some() {
            Some(
                serde_json::from_str(&content)
                    .map_err(|e| ProviderError::MalformedJson(e.to_string()))?,
            )
        } else {
            None
        };

        Ok(ChatResponse {
            content,
            json,
            latency_ms,
        })
    }
}
