//! Texture Array Container
//!
//! Applies every channel of one material family to a consumer. Each mapping
//! either places its source texture into its handler or binds the handler's
//! default, producing one optional slot per mapping.

use serde::Serialize;
use smallvec::SmallVec;
use texpack_core::{
    AllocatorConfig, ArrayPool, ChannelId, ChannelSource, CoreResult, PoolStats, Slot, SlotConsumer,
    TextureArrayBackend,
};

use crate::family::MaterialFamily;
use crate::handler::{Handler, HandlerStats};
use crate::{RendererError, RendererResult};

/// Occupied slots from one apply, indexed like the container's mappings
pub type ChannelSlots = Vec<Option<Slot>>;

/// Source channel feeding a handler
pub struct Mapping<B: TextureArrayBackend> {
    pub handler: Handler<B>,
    pub source: ChannelId,
}

impl<B: TextureArrayBackend> Mapping<B> {
    pub fn new(handler: Handler<B>, source: ChannelId) -> Self {
        Self { handler, source }
    }
}

/// Per-channel container statistics
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStats {
    pub source: ChannelId,
    pub handler: HandlerStats,
}

/// Container statistics
#[derive(Debug, Clone, Serialize)]
pub struct ContainerStats {
    pub family: MaterialFamily,
    pub channels: Vec<ChannelStats>,
    pub pool: PoolStats,
}

impl ContainerStats {
    pub fn page_count(&self) -> usize {
        self.channels.iter().map(|c| c.handler.page_count()).sum()
    }
}

/// Multi-channel orchestration for one material family
pub struct Container<B: TextureArrayBackend> {
    family: MaterialFamily,
    mappings: SmallVec<[Mapping<B>; 4]>,
    pool: ArrayPool<Option<Slot>>,
}

impl<B: TextureArrayBackend> Container<B> {
    /// Create a container with mappings in the given (fixed) order
    pub fn new(family: MaterialFamily, mappings: impl IntoIterator<Item = Mapping<B>>) -> Self {
        Self {
            family,
            mappings: mappings.into_iter().collect(),
            pool: ArrayPool::new(),
        }
    }

    /// Build the handlers of `family`, defaults included
    pub fn from_family(
        backend: &mut B,
        family: MaterialFamily,
        config: &AllocatorConfig,
    ) -> CoreResult<Self> {
        let mut mappings = SmallVec::<[Mapping<B>; 4]>::new();
        for channel in family.channels() {
            let handler = Handler::new(backend, channel.handler, config.clone())?;
            mappings.push(Mapping::new(handler, channel.source));
        }

        log::debug!("Built {} container with {} channels", family, mappings.len());
        Ok(Self::new(family, mappings))
    }

    /// Place every channel of `sources` into its handler and bind it on `consumer`
    ///
    /// Missing textures, format mismatches and backend failures fall back to
    /// the channel default and leave the matching entry `None`. The returned
    /// array goes back through [`Container::release`].
    pub fn apply_from<S, C>(
        &mut self,
        backend: &mut B,
        sources: &S,
        consumer: &mut C,
    ) -> ChannelSlots
    where
        S: ChannelSource<B::Source>,
        C: SlotConsumer<B::Array>,
    {
        let _span = tracing::trace_span!("apply_from", family = %self.family).entered();
        let mut slots = self.pool.acquire(self.mappings.len(), None);

        for (index, mapping) in self.mappings.iter_mut().enumerate() {
            let handler = &mut mapping.handler;

            let fallback_key = match sources.texture(mapping.source) {
                Some(texture) => {
                    let info = backend.describe(texture);
                    let key = handler.key_for(&info);

                    if info.format == handler.format() {
                        match handler.set_item(backend, consumer, texture, key) {
                            Ok(slot) => {
                                slots[index] = Some(slot);
                                continue;
                            }
                            Err(err) => {
                                log::warn!("Failed to place {} ({}): {}", mapping.source, key, err);
                            }
                        }
                    } else {
                        log::trace!(
                            "{} has format {:?}, expected {:?}",
                            mapping.source,
                            info.format,
                            handler.format()
                        );
                    }
                    Some(key)
                }
                None => handler.primary_default_key(),
            };

            if let Some(key) = fallback_key {
                handler.set_default_item(backend, consumer, key);
            }
        }

        slots
    }

    /// Return a result array to the pool. Occupied slots are not freed.
    pub fn release(&mut self, slots: ChannelSlots) {
        self.pool.release(slots);
    }

    /// Free one slot through the handler that owns it
    pub fn free_slot(&mut self, slot: Slot) -> RendererResult<()> {
        let mapping = self
            .mappings
            .iter_mut()
            .find(|m| m.handler.id() == slot.owner())
            .ok_or(RendererError::UnknownOwner(slot.owner()))?;

        mapping.handler.free_slot(slot);
        Ok(())
    }

    /// Free every occupied slot, then release the array
    pub fn release_and_free(&mut self, slots: ChannelSlots) -> RendererResult<()> {
        let mut result = Ok(());
        for slot in slots.iter().flatten() {
            if let Err(err) = self.free_slot(*slot) {
                result = Err(err);
            }
        }

        self.release(slots);
        result
    }

    pub fn family(&self) -> MaterialFamily {
        self.family
    }

    pub fn mappings(&self) -> &[Mapping<B>] {
        &self.mappings
    }

    pub fn handler(&self, index: usize) -> Option<&Handler<B>> {
        self.mappings.get(index).map(|m| &m.handler)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            family: self.family,
            channels: self
                .mappings
                .iter()
                .map(|m| ChannelStats {
                    source: m.source,
                    handler: m.handler.stats(),
                })
                .collect(),
            pool: self.pool.stats(),
        }
    }
}
