//! Conversion between decoded images and base64 PNG payloads

use std::io::{Cursor, ErrorKind};
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::error::PipelineError;
use crate::storage::{BlobStore, ObjectUri};

/// Base64 text of an image, as carried in model API payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Image(String);

impl Base64Image {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Input accepted by `encode_to_base64`
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    /// Image file on local disk, encoded byte for byte
    Path(&'a Path),
    /// Decoded image, re-serialized as PNG
    Image(&'a DynamicImage),
}

/// Fetch `uri` from the store and decode it
pub async fn decode(store: &dyn BlobStore, uri: &str) -> Result<DynamicImage, PipelineError> {
    let location = ObjectUri::parse(uri)?;
    let data = store.get(&location.bucket, &location.key).await?;
    debug!("Decoding {} ({} bytes)", location, data.len());

    image::load_from_memory(&data).map_err(|e| PipelineError::Decode(format!("{}: {}", uri, e)))
}

/// Serialize an image as PNG bytes
pub fn to_png(image: &DynamicImage) -> Result<Vec<u8>, PipelineError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| PipelineError::InvalidInput(format!("cannot encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}

/// Encode an image file or a decoded image as base64
pub fn encode_to_base64(source: ImageSource<'_>) -> Result<Base64Image, PipelineError> {
    let bytes = match source {
        ImageSource::Path(path) => {
            let metadata = match std::fs::metadata(path) {
                Ok(m) => m,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(PipelineError::NotFound(format!(
                        "file {} does not exist",
                        path.display()
                    )))
                }
                Err(e) => return Err(e.into()),
            };
            if !metadata.is_file() {
                return Err(PipelineError::InvalidInput(format!(
                    "expected an image file, got {}",
                    path.display()
                )));
            }
            debug!("Reading image from file: {}", path.display());
            std::fs::read(path)?
        }
        ImageSource::Image(image) => to_png(image)?,
    };

    Ok(Base64Image(BASE64.encode(bytes)))
}

/// Decode a base64 image payload
pub fn decode_base64(data: &str) -> Result<DynamicImage, PipelineError> {
    let bytes = BASE64
        .decode(data.trim())
        .map_err(|e| PipelineError::Decode(format!("invalid base64: {}", e)))?;
    image::load_from_memory(&bytes).map_err(|e| PipelineError::Decode(e.to_string()))
}
