//! wgpu Texture Backend
//!
//! Pages are 2D array textures with one layer per slot. Placing a texture is
//! a `copy_texture_to_texture` of mip 0 into the slot's layer.

use texpack_core::{
    CoreError, CoreResult, PageDescriptor, PixelFormat, TextureArrayBackend, TextureInfo,
};

use crate::cpu::CpuTexture;

/// wgpu format for an allocator pixel format
pub fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        PixelFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
        PixelFormat::Bc1 => wgpu::TextureFormat::Bc1RgbaUnorm,
        PixelFormat::Bc3 => wgpu::TextureFormat::Bc3RgbaUnorm,
        PixelFormat::Bc5 => wgpu::TextureFormat::Bc5RgUnorm,
        PixelFormat::Bc7 => wgpu::TextureFormat::Bc7RgbaUnorm,
    }
}

/// Allocator pixel format for a wgpu format, if supported
pub fn pixel_format(format: wgpu::TextureFormat) -> Option<PixelFormat> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Some(PixelFormat::Rgba8Unorm),
        wgpu::TextureFormat::Rgba8UnormSrgb => Some(PixelFormat::Rgba8UnormSrgb),
        wgpu::TextureFormat::R8Unorm => Some(PixelFormat::R8Unorm),
        wgpu::TextureFormat::Bc1RgbaUnorm => Some(PixelFormat::Bc1),
        wgpu::TextureFormat::Bc3RgbaUnorm => Some(PixelFormat::Bc3),
        wgpu::TextureFormat::Bc5RgUnorm => Some(PixelFormat::Bc5),
        wgpu::TextureFormat::Bc7RgbaUnorm => Some(PixelFormat::Bc7),
        _ => None,
    }
}

/// Source texture on the GPU. Must be created with `COPY_SRC` usage.
#[derive(Debug)]
pub struct GpuTexture {
    texture: wgpu::Texture,
    info: TextureInfo,
}

impl GpuTexture {
    /// Wrap a texture, reading size and format from it
    pub fn from_texture(texture: wgpu::Texture) -> CoreResult<Self> {
        let format = pixel_format(texture.format()).ok_or_else(|| {
            CoreError::Backend(format!("unsupported texture format {:?}", texture.format()))
        })?;
        if !texture.usage().contains(wgpu::TextureUsages::COPY_SRC) {
            return Err(CoreError::Backend("source texture lacks COPY_SRC usage".into()));
        }

        let info = TextureInfo::new(texture.width(), texture.height(), format);
        Ok(Self { texture, info })
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn info(&self) -> &TextureInfo {
        &self.info
    }
}

/// Backend creating array textures on a wgpu device
#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn check_format(&self, format: PixelFormat) -> CoreResult<()> {
        let bc = wgpu::Features::TEXTURE_COMPRESSION_BC;
        if format.is_block_compressed() && !self.device.features().contains(bc) {
            return Err(CoreError::Backend(format!(
                "{:?} requires TEXTURE_COMPRESSION_BC",
                format
            )));
        }
        Ok(())
    }
}

impl TextureArrayBackend for WgpuBackend {
    type Source = GpuTexture;
    type Array = wgpu::Texture;

    fn describe(&self, source: &GpuTexture) -> TextureInfo {
        source.info
    }

    fn create_array(&mut self, descriptor: &PageDescriptor) -> CoreResult<wgpu::Texture> {
        self.check_format(descriptor.format)?;

        let layers = u32::try_from(descriptor.capacity).map_err(|_| {
            CoreError::Backend(format!("{} layers do not fit a texture", descriptor.capacity))
        })?;
        let max_layers = self.device.limits().max_texture_array_layers;
        if layers > max_layers {
            return Err(CoreError::Backend(format!(
                "{} layers exceed the device limit of {}",
                layers, max_layers
            )));
        }

        Ok(self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("texpack-page"),
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(descriptor.format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        }))
    }

    fn copy_into(
        &mut self,
        source: &GpuTexture,
        target: &mut wgpu::Texture,
        layer: u32,
    ) -> CoreResult<()> {
        let info = source.info;
        if texture_format(info.format) != target.format()
            || info.width != target.width()
            || info.height != target.height()
        {
            return Err(CoreError::Backend(format!(
                "{}x{} {:?} texture does not fit a {}x{} {:?} array",
                info.width,
                info.height,
                info.format,
                target.width(),
                target.height(),
                target.format()
            )));
        }
        if layer >= target.depth_or_array_layers() {
            return Err(CoreError::Backend(format!(
                "layer {} out of range for {} layers",
                layer,
                target.depth_or_array_layers()
            )));
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("texpack-copy"),
        });
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &source.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: &*target,
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: info.width,
                height: info.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn create_default(&mut self, info: &TextureInfo, color: [u8; 4]) -> CoreResult<GpuTexture> {
        self.check_format(info.format)?;

        let size = wgpu::Extent3d {
            width: info.width,
            height: info.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("texpack-default"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(info.format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let pixels = CpuTexture::solid(*info, color);
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels.data(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(info.format.bytes_per_row(info.width) as u32),
                rows_per_image: Some(info.format.block_rows(info.height) as u32),
            },
            size,
        );

        Ok(GpuTexture { texture, info: *info })
    }
}
