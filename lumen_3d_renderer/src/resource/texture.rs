/// Image decoding for material textures.
///
/// Decoding is a pluggable collaborator: the resource manager only needs
/// tightly packed RGBA8 pixels plus dimensions. A failed decode is never
/// fatal; the caller binds the fallback texture instead.

use crate::error::{Error, Result};

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// width * height * 4 bytes, row-major, no padding
    pub pixels: Vec<u8>,
}

/// Turns encoded image bytes (PNG, JPEG, ...) into RGBA8 pixels
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage>;
}

/// Default decoder backed by the `image` crate (PNG and JPEG enabled)
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::InvalidResource(format!("Failed to decode image: {}", e)))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(DecodedImage {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
