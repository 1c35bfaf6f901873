//! CPU Texture Backend
//!
//! Keeps pages as plain byte buffers. Used for headless tools and tests.

use texpack_core::{
    CoreError, CoreResult, PageDescriptor, PixelFormat, TextureArrayBackend, TextureInfo,
};

/// Texture living in system memory (mip 0 only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuTexture {
    info: TextureInfo,
    data: Vec<u8>,
}

impl CpuTexture {
    /// Wrap raw layer data, checking it matches the format's layer size
    pub fn new(info: TextureInfo, data: Vec<u8>) -> CoreResult<Self> {
        let expected = info.layer_size();
        if data.len() != expected {
            return Err(CoreError::DataSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { info, data })
    }

    /// Texture filled with a repeating color pattern
    ///
    /// For block-compressed formats the color bytes are repeated through the
    /// block data rather than encoded.
    pub fn solid(info: TextureInfo, color: [u8; 4]) -> Self {
        let size = info.layer_size();
        let data = match info.format {
            PixelFormat::R8Unorm => vec![color[0]; size],
            _ => color.iter().copied().cycle().take(size).collect(),
        };
        Self { info, data }
    }

    pub fn info(&self) -> &TextureInfo {
        &self.info
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// One page of layers in system memory
#[derive(Debug, Clone)]
pub struct CpuArray {
    descriptor: PageDescriptor,
    data: Vec<u8>,
}

impl CpuArray {
    pub fn descriptor(&self) -> &PageDescriptor {
        &self.descriptor
    }

    /// Bytes of one layer, if in range
    pub fn layer(&self, layer: u32) -> Option<&[u8]> {
        let size = self.descriptor.layer_size();
        let start = layer as usize * size;
        self.data.get(start..start + size)
    }
}

/// Backend copying texture bytes into byte-vector pages
#[derive(Debug, Default)]
pub struct CpuBackend {
    arrays_created: usize,
    copies: usize,
    bytes_copied: usize,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arrays_created(&self) -> usize {
        self.arrays_created
    }

    pub fn copies(&self) -> usize {
        self.copies
    }

    pub fn bytes_copied(&self) -> usize {
        self.bytes_copied
    }
}

impl TextureArrayBackend for CpuBackend {
    type Source = CpuTexture;
    type Array = CpuArray;

    fn describe(&self, source: &CpuTexture) -> TextureInfo {
        source.info
    }

    fn create_array(&mut self, descriptor: &PageDescriptor) -> CoreResult<CpuArray> {
        let size = descriptor
            .layer_size()
            .checked_mul(descriptor.capacity)
            .ok_or_else(|| {
                CoreError::Backend(format!("page of {} layers is too large", descriptor.capacity))
            })?;

        self.arrays_created += 1;
        Ok(CpuArray {
            descriptor: *descriptor,
            data: vec![0; size],
        })
    }

    fn copy_into(
        &mut self,
        source: &CpuTexture,
        target: &mut CpuArray,
        layer: u32,
    ) -> CoreResult<()> {
        let descriptor = target.descriptor;
        if source.info.format != descriptor.format {
            return Err(CoreError::Backend(format!(
                "format {:?} cannot be copied into a {:?} array",
                source.info.format, descriptor.format
            )));
        }
        if source.info.width != descriptor.width || source.info.height != descriptor.height {
            return Err(CoreError::Backend(format!(
                "{}x{} texture does not fit a {}x{} array",
                source.info.width, source.info.height, descriptor.width, descriptor.height
            )));
        }
        if layer as usize >= descriptor.capacity {
            return Err(CoreError::Backend(format!(
                "layer {} out of range for {} layers",
                layer, descriptor.capacity
            )));
        }

        let size = descriptor.layer_size();
        let start = layer as usize * size;
        target.data[start..start + size].copy_from_slice(&source.data);

        self.copies += 1;
        self.bytes_copied += size;
        Ok(())
    }

    fn create_default(&mut self, info: &TextureInfo, color: [u8; 4]) -> CoreResult<CpuTexture> {
        Ok(CpuTexture::solid(*info, color))
    }
}
