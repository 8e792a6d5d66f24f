//! Amazon Bedrock runtime integration
//!
//! Provides:
//! - Converse API calls for text generation
//! - InvokeModel calls for image generation
//! - Bounded retries on throttling, server errors and transport failures

mod text;

pub use text::{ConverseTextGenerator, InferenceConfig, TextGenerator};

use std::time::Duration;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::images::ImageModel;
use crate::retry::{RetryPolicy, Transient};

/// Default text model
pub const DEFAULT_TEXT_MODEL: &str = "anthropic.claude-3-haiku-20240307-v1:0";

/// Environment variable holding a Bedrock API key
pub const API_KEY_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

/// Bedrock errors
#[derive(Debug, Error)]
pub enum BedrockError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bedrock API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid Bedrock response: {0}")]
    InvalidResponse(String),

    #[error("Bedrock API key not configured")]
    MissingApiKey,

    #[error("all {attempts} Bedrock attempts failed, last error: {last}")]
    RetryExhausted { attempts: usize, last: String },
}

impl BedrockError {
    /// The provider rejected the request itself (4xx other than throttling)
    pub fn is_client_error(&self) -> bool {
        matches!(self, BedrockError::Api { status, .. } if (400..500).contains(status) && *status != 429)
    }
}

impl Transient for BedrockError {
    fn is_transient(&self) -> bool {
        match self {
            BedrockError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            BedrockError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Bedrock configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BedrockConfig {
    /// Runtime endpoint, e.g. `https://bedrock-runtime.us-east-1.amazonaws.com`
    pub endpoint: String,
    /// Bedrock API key; falls back to `AWS_BEARER_TOKEN_BEDROCK`
    pub api_key: Option<String>,
    /// Model used for prompt and email text
    pub text_model: String,
    /// Model used for image generation
    pub image_model: ImageModel,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://bedrock-runtime.us-east-1.amazonaws.com".to_string(),
            api_key: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: ImageModel::default(),
            timeout_secs: 120,
        }
    }
}

/// Text block inside a chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentBlock {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }
}

/// Chat message for the Converse API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: vec![ContentBlock::text(text)],
        }
    }
}

/// Converse request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<ContentBlock>,
    pub inference_config: InferenceConfig,
}

/// Converse response body
#[derive(Debug, Deserialize)]
struct ConverseResponse {
    output: ConverseOutput,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    message: Option<ChatMessage>,
}

/// Error body returned by the runtime API
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Bedrock runtime client
#[derive(Debug, Clone)]
pub struct BedrockClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl BedrockClient {
    /// Create a new client from configuration
    pub fn new(config: &BedrockConfig, retry: RetryPolicy) -> Result<Self, BedrockError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.is_empty());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            retry,
        })
    }

    /// Check if an API key is configured
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send a Converse request and return the first text block of the reply
    pub async fn converse(
        &self,
        model_id: &str,
        request: &ConverseRequest,
    ) -> Result<String, BedrockError> {
        debug!("Sending converse request to Bedrock: {}", model_id);
        let url = format!("{}/model/{}/converse", self.endpoint, model_id);
        let body = self.post_with_retry("bedrock.converse", &url, request).await?;

        let response: ConverseResponse = serde_json::from_value(body)
            .map_err(|e| BedrockError::InvalidResponse(format!("converse output: {}", e)))?;

        response
            .output
            .message
            .and_then(|m| m.content.into_iter().find_map(|block| block.text))
            .ok_or_else(|| BedrockError::InvalidResponse("no text content in reply".to_string()))
    }

    /// Invoke a model with a JSON body and return its JSON reply
    pub async fn invoke_model<T: Serialize + ?Sized>(
        &self,
        model_id: &str,
        body: &T,
    ) -> Result<serde_json::Value, BedrockError> {
        debug!("Sending invoke request to Bedrock: {}", model_id);
        let url = format!("{}/model/{}/invoke", self.endpoint, model_id);
        self.post_with_retry("bedrock.invoke", &url, body).await
    }

    async fn post_with_retry<T: Serialize + ?Sized>(
        &self,
        what: &str,
        url: &str,
        body: &T,
    ) -> Result<serde_json::Value, BedrockError> {
        let api_key = self.api_key.as_deref().ok_or(BedrockError::MissingApiKey)?;

        self.retry
            .run(what, || self.post_once(url, api_key, body))
            .await
            .map_err(|e| {
                if e.is_transient() {
                    BedrockError::RetryExhausted {
                        attempts: self.retry.attempts(),
                        last: e.to_string(),
                    }
                } else {
                    e
                }
            })
    }

    async fn post_once<T: Serialize + ?Sized>(
        &self,
        url: &str,
        api_key: &str,
        body: &T,
    ) -> Result<serde_json::Value, BedrockError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&raw)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(raw);
            warn!(status = status.as_u16(), message = %message, "Bedrock API error");
            return Err(BedrockError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw = response.bytes().await?;
        serde_json::from_slice(&raw)
            .map_err(|e| BedrockError::InvalidResponse(format!("reply is not JSON: {}", e)))
    }
}
