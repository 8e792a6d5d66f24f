//! Image codec and generation module
//!
//! Provides:
//! - Decoding source images from storage and base64 PNG encoding
//! - Conditioned image generation with Titan v2 and Nova Canvas

pub mod codec;
mod gen;

pub use codec::{decode, decode_base64, encode_to_base64, to_png, Base64Image, ImageSource};
pub use gen::{CanvasImageGenerator, ImageGenerator, ImageModel, ImageRequest, NEGATIVE_PROMPT};
