//! Keys and identifiers
//!
//! Value types used to route textures to the right paging structure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pixel formats understood by the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    R8Unorm,
    /// BC1 (DXT1), 8 bytes per 4x4 block
    Bc1,
    /// BC3 (DXT5), 16 bytes per 4x4 block
    Bc3,
    /// BC5, two-channel normal maps
    Bc5,
    /// BC7, high quality RGBA
    Bc7,
}

impl PixelFormat {
    /// Whether the format stores 4x4 blocks instead of pixels
    pub fn is_block_compressed(&self) -> bool {
        matches!(self, Self::Bc1 | Self::Bc3 | Self::Bc5 | Self::Bc7)
    }

    /// Edge length of one storage block in pixels
    pub fn block_size(&self) -> u32 {
        if self.is_block_compressed() { 4 } else { 1 }
    }

    /// Bytes per storage block (per pixel for uncompressed formats)
    pub fn bytes_per_block(&self) -> usize {
        match self {
            Self::Rgba8Unorm | Self::Rgba8UnormSrgb => 4,
            Self::R8Unorm => 1,
            Self::Bc1 => 8,
            Self::Bc3 | Self::Bc5 | Self::Bc7 => 16,
        }
    }

    /// Bytes in one row of blocks
    pub fn bytes_per_row(&self, width: u32) -> usize {
        width.div_ceil(self.block_size()) as usize * self.bytes_per_block()
    }

    /// Number of block rows for the given height
    pub fn block_rows(&self, height: u32) -> usize {
        height.div_ceil(self.block_size()) as usize
    }

    /// Bytes of a single mip-0 layer
    pub fn layer_size(&self, width: u32, height: u32) -> usize {
        self.bytes_per_row(width) * self.block_rows(height)
    }
}

/// Size bucket: textures sharing a key share a paging structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SizeKey {
    pub width: u32,
    pub height: u32,
    /// Optional role tag separating otherwise identical sizes
    pub variant: u32,
}

impl SizeKey {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, variant: 0 }
    }

    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    pub fn with_variant(self, variant: u32) -> Self {
        Self { variant, ..self }
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }
}

impl fmt::Display for SizeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variant == 0 {
            write!(f, "{}x{}", self.width, self.height)
        } else {
            write!(f, "{}x{}#{}", self.width, self.height, self.variant)
        }
    }
}

/// Source texture channel (material property the texture is read from)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChannelId(pub &'static str);

impl ChannelId {
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Named property set on a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ShaderProperty(pub &'static str);

impl ShaderProperty {
    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// The two properties a channel binds: array index and array texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ArrayProperties {
    pub index: ShaderProperty,
    pub array: ShaderProperty,
}

impl ArrayProperties {
    pub const fn new(index: &'static str, array: &'static str) -> Self {
        Self {
            index: ShaderProperty(index),
            array: ShaderProperty(array),
        }
    }
}

/// Dimensions and format of a texture as reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl TextureInfo {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self { width, height, format }
    }

    pub fn size_key(&self, variant: u32) -> SizeKey {
        SizeKey::new(self.width, self.height).with_variant(variant)
    }

    pub fn layer_size(&self) -> usize {
        self.format.layer_size(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_size_key_equality() {
        assert_eq!(SizeKey::square(256), SizeKey::new(256, 256));
        assert_ne!(SizeKey::square(256), SizeKey::square(256).with_variant(1));

        let keys: HashSet<_> =
            [SizeKey::square(256), SizeKey::new(256, 256), SizeKey::new(256, 128)]
                .into_iter()
                .collect();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_size_key_display() {
        assert_eq!(SizeKey::new(512, 256).to_string(), "512x256");
        assert_eq!(SizeKey::square(64).with_variant(2).to_string(), "64x64#2");
    }

    #[test]
    fn test_layer_sizes() {
        assert_eq!(PixelFormat::Rgba8Unorm.layer_size(4, 4), 64);
        assert_eq!(PixelFormat::R8Unorm.layer_size(8, 2), 16);
        assert_eq!(PixelFormat::Bc1.layer_size(8, 8), 32);
        assert_eq!(PixelFormat::Bc7.layer_size(8, 8), 64);
        // Partial blocks round up
        assert_eq!(PixelFormat::Bc7.layer_size(2, 2), 16);
    }
}
