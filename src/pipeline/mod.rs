//! Email personalization pipeline
//!
//! One invocation, strictly in order:
//! 1. Fetch and decode the source product image
//! 2. Load the batch segment recommendations and select the target audience
//! 3. LLM writes a short edit instruction for the image
//! 4. Image model redraws the product image; result stored as PNG
//! 5. LLM writes the email as JSON; the image key is attached and the JSON stored

pub mod audience;
pub mod email;
mod request;

pub use audience::{AudienceSegment, RecommendationRecord};
pub use email::{EmailDraft, EmailPayload};
pub use request::{validate_bucket_name, BucketNameError, InvocationRequest, InvocationResponse};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::bedrock::{BedrockClient, ConverseTextGenerator, TextGenerator};
use crate::config::Config;
use crate::error::PipelineError;
use crate::images::{self, CanvasImageGenerator, ImageGenerator, ImageSource};
use crate::prompts::{PromptComposer, DEFAULT_AUDIENCE, DEFAULT_SUBJECT};
use crate::storage::{self, generate_key, BlobStore, JSON_CONTENT_TYPE};

/// Item the campaign targets by default (a jacket in the sample catalog)
pub const DEFAULT_TARGET_ITEM_ID: &str =
    "1de0c711-042b-4b47-93d9-3a7d8d969ac61de0c711-042b-4b47-93d9-3a7d8d969ac6";

/// Default location of the batch segment job file in the output bucket
pub const DEFAULT_RECOMMENDATIONS_KEY: &str = "hyper-personalisation/batchsegmentjob_input.json";

/// What the campaign promotes and to whom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    pub subject: String,
    pub audience: String,
    pub target_item_id: String,
    pub recommendations_key: String,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            target_item_id: DEFAULT_TARGET_ITEM_ID.to_string(),
            recommendations_key: DEFAULT_RECOMMENDATIONS_KEY.to_string(),
        }
    }
}

/// Artifacts produced by one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationOutcome {
    pub image_key: String,
    pub email_key: String,
    pub segment: Option<AudienceSegment>,
}

/// The personalization pipeline with its collaborators
pub struct Pipeline {
    store: Arc<dyn BlobStore>,
    text: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageGenerator>,
    campaign: CampaignConfig,
    prompts: PromptComposer,
}

impl Pipeline {
    /// Create a pipeline from explicit collaborators
    pub fn new(
        store: Arc<dyn BlobStore>,
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        campaign: CampaignConfig,
    ) -> Self {
        let prompts = PromptComposer::new(&campaign.subject, &campaign.audience);
        Self {
            store,
            text,
            images,
            campaign,
            prompts,
        }
    }

    /// Build storage and Bedrock clients from configuration
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let store = storage::open(&config.storage, config.retry)?;
        let bedrock = Arc::new(BedrockClient::new(&config.bedrock, config.retry)?);
        if !bedrock.is_configured() {
            warn!("Bedrock API key not configured; model calls will fail");
        }

        let text = Arc::new(ConverseTextGenerator::new(
            bedrock.clone(),
            &config.bedrock.text_model,
        ));
        let images = Arc::new(CanvasImageGenerator::new(
            bedrock,
            store.clone(),
            config.bedrock.image_model,
        ));

        info!(
            "Pipeline ready: storage={}, text={}, image={}",
            store.name(),
            config.bedrock.text_model,
            config.bedrock.image_model.model_id()
        );
        Ok(Self::new(store, text, images, config.campaign.clone()))
    }

    /// The blob store used for inputs and artifacts
    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Run one invocation end to end
    #[instrument(
        name = "invoke",
        skip_all,
        fields(s3_uri = %request.s3_uri, bucket = %request.s3_bucket_name)
    )]
    pub async fn invoke(
        &self,
        request: &InvocationRequest,
    ) -> Result<InvocationOutcome, PipelineError> {
        request.validate()?;
        let bucket = request.s3_bucket_name.as_str();

        // Step 1: Source image
        let base_image = images::decode(self.store.as_ref(), &request.s3_uri).await?;
        info!(
            "Loaded source image {}x{}",
            base_image.width(),
            base_image.height()
        );

        // Step 2: Audience
        let segment = self.select_segment(bucket).await;

        // Step 3: Edit instruction
        let image_b64 = images::encode_to_base64(ImageSource::Image(&base_image))?;
        let edit_prompt = self
            .text
            .generate(&self.prompts.edit_instruction(), None)
            .await?
            .ok_or(PipelineError::GenerationFailed {
                stage: "edit instruction",
            })?;
        let edit_prompt = edit_prompt.trim();
        info!("Edit instruction: {}", edit_prompt);

        // Step 4: Generated image
        let image_key = self.images.generate(edit_prompt, &image_b64, bucket).await?;

        // Step 5: Email
        let email_key = match self.compose_email(bucket, &image_key).await {
            Ok(key) => key,
            Err(e) => {
                warn!(
                    image_key = %image_key,
                    "Email generation failed; generated image left in {}",
                    bucket
                );
                return Err(e);
            }
        };

        info!(
            "Invocation complete: image={}, email={}",
            image_key, email_key
        );
        Ok(InvocationOutcome {
            image_key,
            email_key,
            segment,
        })
    }

    async fn select_segment(&self, bucket: &str) -> Option<AudienceSegment> {
        let records = audience::load_recommendations(
            self.store.as_ref(),
            bucket,
            &self.campaign.recommendations_key,
        )
        .await?;

        match audience::select_audience(&records, &self.campaign.target_item_id) {
            Some(segment) => {
                info!(
                    item_id = %segment.item_id,
                    users = segment.users.len(),
                    "Selected audience segment"
                );
                debug!("Users list: {:?}", segment.users);
                Some(segment)
            }
            None => {
                info!(
                    target = %self.campaign.target_item_id,
                    records = records.len(),
                    "No recommendation record matches the target item"
                );
                None
            }
        }
    }

    async fn compose_email(&self, bucket: &str, image_key: &str) -> Result<String, PipelineError> {
        let raw = self
            .text
            .generate(&self.prompts.email_composition(), None)
            .await?
            .ok_or(PipelineError::GenerationFailed {
                stage: "email composition",
            })?;
        debug!("Email model output: {}", raw);

        let payload = EmailDraft::parse(&raw)?.with_image(image_key);
        let email_key = generate_key("", "json");
        self.store
            .put(
                bucket,
                &email_key,
                payload.to_json()?.into_bytes(),
                JSON_CONTENT_TYPE,
            )
            .await?;

        info!("Email payload stored at {}/{}", bucket, email_key);
        Ok(email_key)
    }
}
