//! Conditioned image generation
//!
//! The text model's edit instruction and the source product image go to an
//! image model in edge-guided (Canny) mode. The first returned image is stored
//! as PNG under a fresh key.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::codec::{decode_base64, to_png, Base64Image};
use crate::bedrock::BedrockClient;
use crate::error::PipelineError;
use crate::storage::{generate_key, BlobStore, PNG_CONTENT_TYPE};

/// Negative prompt sent with every generation request
pub const NEGATIVE_PROMPT: &str = "poor quality, low resolution";

/// Output edge length in pixels
pub const IMAGE_SIZE: u32 = 512;

/// Classifier-free guidance scale
pub const CFG_SCALE: f64 = 8.0;

/// Conditioning on the source image's edge map
const CONTROL_MODE: &str = "CANNY_EDGE";

/// Image generation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageModel {
    /// Amazon Titan Image Generator v2
    TitanV2,
    /// Amazon Nova Canvas
    #[default]
    NovaCanvas,
}

impl ImageModel {
    /// Bedrock model identifier
    pub fn model_id(&self) -> &'static str {
        match self {
            ImageModel::TitanV2 => "amazon.titan-image-generator-v2:0",
            ImageModel::NovaCanvas => "amazon.nova-canvas-v1:0",
        }
    }

    /// Explicit conditioning weight; `None` leaves the model default
    pub fn control_strength(&self) -> Option<f64> {
        match self {
            ImageModel::TitanV2 => Some(0.9),
            ImageModel::NovaCanvas => None,
        }
    }

    /// Prefix for stored image keys
    pub fn key_prefix(&self) -> &'static str {
        match self {
            ImageModel::TitanV2 => "",
            ImageModel::NovaCanvas => "nova_",
        }
    }
}

/// Image generation request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest<'a> {
    task_type: &'static str,
    text_to_image_params: TextToImageParams<'a>,
    image_generation_config: ImageGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextToImageParams<'a> {
    text: &'a str,
    negative_text: &'static str,
    condition_image: &'a str,
    control_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    control_strength: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageGenerationConfig {
    number_of_images: u32,
    height: u32,
    width: u32,
    cfg_scale: f64,
}

impl<'a> ImageRequest<'a> {
    /// Build a text-to-image request conditioned on `condition_image`
    pub fn conditioned(model: ImageModel, prompt: &'a str, condition_image: &'a Base64Image) -> Self {
        Self {
            task_type: "TEXT_IMAGE",
            text_to_image_params: TextToImageParams {
                text: prompt,
                negative_text: NEGATIVE_PROMPT,
                condition_image: condition_image.as_str(),
                control_mode: CONTROL_MODE,
                control_strength: model.control_strength(),
            },
            image_generation_config: ImageGenerationConfig {
                number_of_images: 1,
                height: IMAGE_SIZE,
                width: IMAGE_SIZE,
                cfg_scale: CFG_SCALE,
            },
        }
    }
}

/// Image generation response body
#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Produces and stores an image from a prompt and a conditioning image
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image and store it in `bucket`; returns the stored key
    async fn generate(
        &self,
        prompt: &str,
        condition_image: &Base64Image,
        bucket: &str,
    ) -> Result<String, PipelineError>;
}

/// `ImageGenerator` backed by a Bedrock canvas model
pub struct CanvasImageGenerator {
    bedrock: Arc<BedrockClient>,
    store: Arc<dyn BlobStore>,
    model: ImageModel,
}

impl CanvasImageGenerator {
    pub fn new(bedrock: Arc<BedrockClient>, store: Arc<dyn BlobStore>, model: ImageModel) -> Self {
        Self {
            bedrock,
            store,
            model,
        }
    }
}

#[async_trait]
impl ImageGenerator for CanvasImageGenerator {
    async fn generate(
        &self,
        prompt: &str,
        condition_image: &Base64Image,
        bucket: &str,
    ) -> Result<String, PipelineError> {
        let request = ImageRequest::conditioned(self.model, prompt, condition_image);

        debug!("Requesting image generation from {}", self.model.model_id());
        let reply = self
            .bedrock
            .invoke_model(self.model.model_id(), &request)
            .await?;

        let response: ImageResponse = serde_json::from_value(reply)
            .map_err(|e| PipelineError::InvalidResponse(format!("image output: {}", e)))?;

        if let Some(error) = response.error.filter(|e| !e.is_empty()) {
            return Err(PipelineError::InvalidResponse(error));
        }
        let first = response
            .images
            .first()
            .ok_or_else(|| PipelineError::InvalidResponse("no image generated".to_string()))?;

        let image = decode_base64(first)?;
        let png = to_png(&image)?;

        let key = generate_key(self.model.key_prefix(), "png");
        self.store.put(bucket, &key, png, PNG_CONTENT_TYPE).await?;

        info!(
            "Generated {}x{} image stored at {}/{}",
            image.width(),
            image.height(),
            bucket,
            key
        );
        Ok(key)
    }
}
