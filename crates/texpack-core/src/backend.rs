//! Backend capabilities
//!
//! The allocator never touches a GPU API directly. Array creation and
//! texture copies go through [`TextureArrayBackend`], binding goes through
//! [`SlotConsumer`], and source textures are looked up with [`ChannelSource`].

use std::collections::HashMap;
use std::hash::BuildHasher;

use ahash::AHashMap;

use crate::CoreResult;
use crate::key::{ChannelId, ShaderProperty, TextureInfo};
use crate::page::{Page, PageDescriptor};

/// GPU (or mock) implementation of texture-array storage
pub trait TextureArrayBackend {
    /// A single source texture
    type Source;
    /// One page worth of array storage
    type Array;

    /// Size and format of a source texture
    fn describe(&self, source: &Self::Source) -> TextureInfo;

    /// Create the storage for a new page
    fn create_array(&mut self, descriptor: &PageDescriptor) -> CoreResult<Self::Array>;

    /// Copy mip 0 of `source` into `layer` of `target`
    fn copy_into(
        &mut self,
        source: &Self::Source,
        target: &mut Self::Array,
        layer: u32,
    ) -> CoreResult<()>;

    /// Build a solid-color texture used as a channel fallback
    fn create_default(&mut self, info: &TextureInfo, color: [u8; 4]) -> CoreResult<Self::Source>;
}

/// Render-time consumer of `(array, index)` bindings, usually a material
pub trait SlotConsumer<A> {
    fn set_array(&mut self, property: &ShaderProperty, page: &Page<A>);

    fn set_array_index(&mut self, property: &ShaderProperty, index: u32);
}

/// Source textures keyed by channel
pub trait ChannelSource<S> {
    fn texture(&self, channel: ChannelId) -> Option<&S>;
}

impl<S, H: BuildHasher> ChannelSource<S> for HashMap<ChannelId, S, H> {
    fn texture(&self, channel: ChannelId) -> Option<&S> {
        self.get(&channel)
    }
}

impl<S> ChannelSource<S> for AHashMap<ChannelId, S> {
    fn texture(&self, channel: ChannelId) -> Option<&S> {
        self.get(&channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_source_maps() {
        let mut std_map = HashMap::new();
        std_map.insert(ChannelId("_BaseMap"), 7u32);
        assert_eq!(std_map.texture(ChannelId("_BaseMap")), Some(&7));
        assert_eq!(std_map.texture(ChannelId("_BumpMap")), None);

        let mut fast_map = AHashMap::new();
        fast_map.insert(ChannelId("_BumpMap"), 3u32);
        assert_eq!(fast_map.texture(ChannelId("_BumpMap")), Some(&3));
    }
}
