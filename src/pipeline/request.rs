//! Invocation request/response shapes and request validation

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Incoming invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Source image location, `s3://bucket/key`
    pub s3_uri: String,
    /// Bucket receiving the generated image and email
    pub s3_bucket_name: String,
}

/// Response returned to the invoker on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            body: String::new(),
        }
    }
}

/// Bucket name errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketNameError {
    /// Must be 3-63 characters
    Length,
    /// Lowercase letters, digits, dots and hyphens; alphanumeric at both ends
    InvalidFormat,
    /// No consecutive dots
    ConsecutiveDots,
    /// Must not look like an IPv4 address
    IpAddress,
}

impl std::fmt::Display for BucketNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketNameError::Length => write!(f, "bucket name must be 3-63 characters"),
            BucketNameError::InvalidFormat => write!(
                f,
                "bucket name must be lowercase alphanumeric, dots or hyphens, and start/end with alphanumeric"
            ),
            BucketNameError::ConsecutiveDots => {
                write!(f, "bucket name cannot contain consecutive dots (..)")
            }
            BucketNameError::IpAddress => write!(f, "bucket name cannot be an IP address"),
        }
    }
}

impl std::error::Error for BucketNameError {}

static BUCKET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9.-]*[a-z0-9])?$").unwrap());

static IPV4_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").unwrap());

/// Validate an S3 bucket name.
///
/// # Rules
/// - Length: 3-63 characters
/// - Lowercase alphanumeric, dots and hyphens
/// - Must start and end with alphanumeric character
/// - No consecutive dots, not an IPv4 address
pub fn validate_bucket_name(name: &str) -> Result<(), BucketNameError> {
    if name.len() < 3 || name.len() > 63 {
        return Err(BucketNameError::Length);
    }
    if !BUCKET_REGEX.is_match(name) {
        return Err(BucketNameError::InvalidFormat);
    }
    if name.contains("..") {
        return Err(BucketNameError::ConsecutiveDots);
    }
    if IPV4_REGEX.is_match(name) {
        return Err(BucketNameError::IpAddress);
    }
    Ok(())
}

impl InvocationRequest {
    /// Check the output bucket before any external call is made
    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_bucket_name(&self.s3_bucket_name).map_err(|e| {
            PipelineError::InvalidRequest(format!("{:?}: {}", self.s3_bucket_name, e))
        })
    }
}
