//! Text generation over the Converse API

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BedrockClient, BedrockError, ChatMessage, ContentBlock, ConverseRequest};

/// Inference parameters sent with every Converse request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for InferenceConfig {
    /// Greedy decoding with a 4000-token ceiling
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            temperature: 0.0,
            top_p: 1.0,
        }
    }
}

/// Produces text from a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`, optionally steered by a system prompt.
    ///
    /// `Ok(None)` means the provider rejected the request as a client error;
    /// the rejection has already been logged.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<Option<String>, BedrockError>;
}

/// `TextGenerator` backed by a Bedrock chat model
#[derive(Debug, Clone)]
pub struct ConverseTextGenerator {
    client: Arc<BedrockClient>,
    model_id: String,
    inference: InferenceConfig,
}

impl ConverseTextGenerator {
    pub fn new(client: Arc<BedrockClient>, model_id: &str) -> Self {
        Self {
            client,
            model_id: model_id.to_string(),
            inference: InferenceConfig::default(),
        }
    }

    fn request(&self, prompt: &str, system_prompt: Option<&str>) -> ConverseRequest {
        ConverseRequest {
            messages: vec![ChatMessage::user(prompt)],
            system: system_prompt
                .filter(|s| !s.is_empty())
                .map(|s| vec![ContentBlock::text(s)])
                .unwrap_or_default(),
            inference_config: self.inference,
        }
    }
}

#[async_trait]
impl TextGenerator for ConverseTextGenerator {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<Option<String>, BedrockError> {
        let request = self.request(prompt, system_prompt);
        match self.client.converse(&self.model_id, &request).await {
            Ok(text) => {
                debug!("Model {} replied: {}", self.model_id, text);
                Ok(Some(text))
            }
            Err(e) if e.is_client_error() => {
                warn!(model = %self.model_id, "A client error occurred: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
