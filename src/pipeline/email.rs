//! Email payload produced by the text model

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Email as returned by the model, before the image reference is attached
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub content: String,
}

impl EmailDraft {
    /// Parse model output strictly as a JSON object with string `subject`
    /// and `content` fields. Extra fields are ignored.
    pub fn parse(text: &str) -> Result<Self, PipelineError> {
        let malformed = |e: serde_json::Error| PipelineError::MalformedModelOutput(e.to_string());

        let value: serde_json::Value = serde_json::from_str(text.trim()).map_err(malformed)?;
        if !value.is_object() {
            return Err(PipelineError::MalformedModelOutput(
                "expected a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(malformed)
    }

    /// Attach the stored image key
    pub fn with_image(self, image_uri: &str) -> EmailPayload {
        EmailPayload {
            subject: self.subject,
            content: self.content,
            image_uri: image_uri.to_string(),
        }
    }
}

/// Email persisted for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPayload {
    pub subject: String,
    pub content: String,
    pub image_uri: String,
}

impl EmailPayload {
    pub fn to_json(&self) -> Result<String, PipelineError> {
        serde_json::to_string(self).map_err(|e| PipelineError::InvalidInput(e.to_string()))
    }
}
