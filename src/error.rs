//! Invocation-level errors

use thiserror::Error;

use crate::bedrock::BedrockError;
use crate::storage::StorageError;

/// Errors that abort a pipeline invocation
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("text generation returned no output at {stage}")]
    GenerationFailed { stage: &'static str },

    #[error("malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("model error: {0}")]
    Model(#[from] BedrockError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for PipelineError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { bucket, key } => {
                PipelineError::NotFound(format!("{}/{}", bucket, key))
            }
            StorageError::InvalidUri { .. } => PipelineError::InvalidRequest(e.to_string()),
            other => PipelineError::Storage(other),
        }
    }
}

impl PipelineError {
    /// Stable error-type name reported in fault responses
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::NotFound(_) => "NotFoundError",
            PipelineError::Decode(_) => "DecodeError",
            PipelineError::InvalidInput(_) => "InvalidInputError",
            PipelineError::InvalidRequest(_) => "InvalidRequestError",
            PipelineError::GenerationFailed { .. } => "GenerationFailed",
            PipelineError::MalformedModelOutput(_) => "MalformedModelOutputError",
            PipelineError::InvalidResponse(_) => "InvalidResponseError",
            PipelineError::Storage(_) => "StorageError",
            PipelineError::Model(_) => "ModelError",
            PipelineError::Io(_) => "IoError",
        }
    }
}
