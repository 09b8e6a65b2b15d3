//! Client for an OpenAI-compatible chat-completion endpoint (DeepInfra by default).
//!
//! The client is built once from [`InferenceConfig`] and shared through the
//! application state. Every call is a single request bounded by the configured
//! timeout; failures are surfaced to the caller as [`Error::Upstream`] and never
//! retried.

use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{INFERENCE_API_KEY_VAR, InferenceConfig};
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling settings for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the provider for a JSON object reply (`response_format = json_object`)
    pub json_mode: bool,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct InferenceClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
}

/// Makes sure a url has a trailing slash, so `join` appends instead of replacing the
/// last path segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let path = format!("{}/", new_url.path());
        new_url.set_path(&path);
        new_url
    }
}

impl InferenceClient {
    pub fn new(config: &InferenceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create inference HTTP client")?;
        let endpoint = ensure_slash(&config.base_url)
            .join("chat/completions")
            .context("Failed to construct chat completions URL")?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fail with [`Error::NotConfigured`] when no API key is available.
    pub fn ensure_configured(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(Error::NotConfigured {
                variable: INFERENCE_API_KEY_VAR.to_string(),
            })
        }
    }

    /// Send one chat completion and return the first choice's content (`""` when the
    /// provider returned none).
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()), err)]
    pub async fn complete(&self, messages: &[ChatMessage], options: CompletionOptions) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| Error::NotConfigured {
            variable: INFERENCE_API_KEY_VAR.to_string(),
        })?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            response_format: options.json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        debug!("Calling inference endpoint {}", self.endpoint);
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Upstream {
                message: e.to_string(),
                details: json!({ "message": e.to_string() }),
            })?;

        let status = response.status();
        let body_text = response.text().await.map_err(|e| Error::Upstream {
            message: e.to_string(),
            details: json!({ "status": status.as_u16() }),
        })?;
        let body: Value = serde_json::from_str(&body_text).unwrap_or_else(|_| Value::String(body_text.clone()));

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            warn!(%status, "Inference provider returned an error payload");
            return Err(Error::Upstream {
                message: upstream_message(error),
                details: body,
            });
        }

        if !status.is_success() {
            warn!(%status, "Inference provider returned a non-success status");
            return Err(Error::Upstream {
                message: format!("Inference API error: {status}"),
                details: body,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_value(body.clone()).map_err(|e| Error::Upstream {
            message: format!("error decoding response body: {e}"),
            details: body,
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default())
    }
}

/// Human-readable message from an `error` field, which providers send either as a
/// string or as `{"message": ...}`.
fn upstream_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}
