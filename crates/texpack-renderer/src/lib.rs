//! # Texpack Renderer
//!
//! Texture-array placement for materials.
//!
//! ## Features
//! - Per-channel handlers dispatching textures by resolution
//! - Default textures bound when a channel has no usable source
//! - Per-family containers applying all channels of a material at once
//! - Registry building one container per material family
//! - CPU backend for tools and tests, wgpu backend behind the `wgpu` feature

pub mod container;
pub mod cpu;
pub mod family;
pub mod handler;
pub mod material;
pub mod registry;

#[cfg(feature = "wgpu")]
pub mod gpu;

pub use container::{ChannelSlots, Container, ContainerStats, Mapping};
pub use cpu::{CpuArray, CpuBackend, CpuTexture};
pub use family::{ChannelMapping, MaterialFamily};
pub use handler::{Handler, HandlerDescriptor, HandlerStats};
pub use material::{Material, MaterialProperty};
pub use registry::{ContainerRegistry, SharedContainer};

#[cfg(feature = "wgpu")]
pub use gpu::{GpuTexture, WgpuBackend};

use texpack_core::{CoreError, OwnerId};
use thiserror::Error;

/// Renderer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RendererError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Slot owner {0:?} does not belong to this container")]
    UnknownOwner(OwnerId),
}

/// Result type for renderer operations
pub type RendererResult<T> = Result<T, RendererError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;
    use texpack_core::{AllocatorConfig, ChannelId, PixelFormat, TextureInfo};

    fn config() -> AllocatorConfig {
        AllocatorConfig {
            min_array_size: 2,
            default_resolution: 4,
            ..AllocatorConfig::default()
        }
    }

    #[test]
    fn test_material_round_trip_through_registry() {
        let mut backend = CpuBackend::new();
        let mut registry = ContainerRegistry::new(config()).unwrap();
        let container = registry.get_cached(&mut backend, "DCL/Scene").unwrap();

        let mut sources = AHashMap::new();
        sources.insert(
            ChannelId("_BaseMap"),
            CpuTexture::solid(TextureInfo::new(8, 8, PixelFormat::Bc7), [10, 20, 30, 40]),
        );

        let mut material = Material::new("avatar_body", "DCL/Scene");
        let mut container = container.lock();
        let slots = container.apply_from(&mut backend, &sources, &mut material);

        assert!(slots[0].is_some());
        assert_eq!(&slots[1..], &[None, None]);

        let albedo = container.handler(0).unwrap();
        let (page, index) = material.array_binding(albedo.properties()).unwrap();
        assert_eq!(index, 0);
        let slot_handler = albedo.slot_handler(&texpack_core::SizeKey::square(8)).unwrap();
        assert_eq!(slot_handler.page(0).unwrap().id(), page);

        container.release_and_free(slots).unwrap();
    }

    #[test]
    fn test_error_display() {
        let err = RendererError::from(CoreError::InvalidConfig("bad".into()));
        assert_eq!(err.to_string(), "Invalid allocator configuration: bad");
    }
}
