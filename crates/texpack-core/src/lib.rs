//! # Texpack Core
//!
//! Paging slot allocator for packing same-sized textures into texture arrays.
//!
//! This crate provides the engine-agnostic half of the texture-array system:
//! - **Keys**: size buckets, pixel formats and shader property identifiers
//! - **Pages**: fixed-capacity array resources created through a backend
//! - **Slots**: free-list paging allocator handing out `(page, index)` handles
//! - **Backend**: injected GPU copy and consumer binding capabilities
//! - **Pool**: reusable result buffers

pub mod backend;
pub mod key;
pub mod page;
pub mod pool;
pub mod slot;

pub use backend::{ChannelSource, SlotConsumer, TextureArrayBackend};
pub use key::{ArrayProperties, ChannelId, PixelFormat, ShaderProperty, SizeKey, TextureInfo};
pub use page::{Page, PageDescriptor, PageId};
pub use pool::{ArrayPool, PoolStats};
pub use slot::{OwnerId, Slot, SlotHandler, SlotHandlerStats};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allocator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Page limit of {max_pages} reached for {key}")]
    CapacityExceeded { key: SizeKey, max_pages: usize },

    #[error("Invalid allocator configuration: {0}")]
    InvalidConfig(String),

    #[error("Texture backend failure: {0}")]
    Backend(String),

    #[error("Texture data size mismatch: expected {expected} bytes, got {actual}")]
    DataSize { expected: usize, actual: usize },
}

/// Result type for allocator operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Allocator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Layers per page for square keys
    pub min_array_size: usize,
    /// Capacity divisor applied to non-square keys
    pub non_square_divisor: usize,
    /// Resolution of generated default textures
    pub default_resolution: u32,
    /// Optional page cap per size key (`None` grows without bound)
    pub max_pages_per_key: Option<usize>,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            min_array_size: 100,
            non_square_divisor: 10,
            default_resolution: 256,
            max_pages_per_key: None,
        }
    }
}

impl AllocatorConfig {
    /// Pages per key for the given size bucket.
    ///
    /// Non-square assets are rare, so their pages are much smaller.
    pub fn capacity_for(&self, key: &SizeKey) -> usize {
        if key.is_square() {
            self.min_array_size
        } else {
            (self.min_array_size / self.non_square_divisor).max(1)
        }
    }

    /// Key under which generated defaults are stored
    pub fn default_key(&self) -> SizeKey {
        SizeKey::square(self.default_resolution)
    }

    /// Reject configurations the allocator cannot run with
    pub fn validate(&self) -> CoreResult<()> {
        if self.min_array_size == 0 {
            return Err(CoreError::InvalidConfig("min_array_size must be positive".into()));
        }
        if self.non_square_divisor == 0 {
            return Err(CoreError::InvalidConfig("non_square_divisor must be positive".into()));
        }
        if self.default_resolution == 0 {
            return Err(CoreError::InvalidConfig("default_resolution must be positive".into()));
        }
        // Block-compressed defaults are built from whole 4x4 blocks
        if self.default_resolution % 4 != 0 {
            return Err(CoreError::InvalidConfig(format!(
                "default_resolution {} is not a multiple of 4",
                self.default_resolution
            )));
        }
        if self.max_pages_per_key == Some(0) {
            return Err(CoreError::InvalidConfig("max_pages_per_key must be positive".into()));
        }
        Ok(())
    }
}
