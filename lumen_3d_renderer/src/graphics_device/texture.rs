/// Texture trait and texture descriptor

/// Texture and attachment formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    D32_FLOAT,
}

impl TextureFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> u32 {
        4
    }

    /// Whether this is a depth format
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::D32_FLOAT)
    }
}

/// Sampler configuration, resolved to a cached GPU sampler by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerType {
    /// Linear filtering, repeat addressing (material textures)
    LinearRepeat,
    /// Linear filtering, clamp-to-edge addressing
    LinearClamp,
    /// Nearest filtering, repeat addressing
    NearestRepeat,
    /// Nearest filtering, clamp-to-edge addressing
    NearestClamp,
}

/// Descriptor for creating a sampled 2D texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug label
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Tightly packed pixels (width * height * bytes_per_pixel), uploaded at creation
    pub data: Option<Vec<u8>>,
}

/// Read-only texture properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Texture resource trait
///
/// The texture is destroyed when dropped.
pub trait Texture: Send + Sync {
    /// Texture properties
    fn info(&self) -> &TextureInfo;
}
