//! Channel Handler
//!
//! Owns the paging structures of one texture channel (albedo, normal, ...)
//! across every resolution it sees, together with the channel's default
//! textures. A default always occupies slot 0 of its key's first page.

use std::collections::hash_map::Entry;

use ahash::AHashMap;
use serde::Serialize;
use texpack_core::{
    AllocatorConfig, ArrayProperties, ChannelId, CoreError, CoreResult, OwnerId, PageDescriptor,
    PixelFormat, SizeKey, Slot, SlotConsumer, SlotHandler, SlotHandlerStats, TextureArrayBackend,
    TextureInfo,
};

/// Static description of a channel handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerDescriptor {
    /// Channel the handler serves
    pub channel: ChannelId,
    /// Format every texture placed in this channel must have
    pub format: PixelFormat,
    /// Consumer properties receiving the array and the layer index
    pub properties: ArrayProperties,
    /// Solid color of the generated default texture, if the channel has one
    pub default_color: Option<[u8; 4]>,
    /// Variant tag mixed into every size key
    pub variant: u32,
}

/// Usage snapshot of a handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerStats {
    pub channel: ChannelId,
    pub format: PixelFormat,
    pub defaults: usize,
    pub slot_handlers: Vec<SlotHandlerStats>,
}

impl HandlerStats {
    pub fn page_count(&self) -> usize {
        self.slot_handlers.iter().map(|s| s.pages).sum()
    }

    pub fn allocated(&self) -> usize {
        self.slot_handlers.iter().map(|s| s.allocated).sum()
    }
}

/// Per-channel, multi-resolution slot dispatch
pub struct Handler<B: TextureArrayBackend> {
    id: OwnerId,
    descriptor: HandlerDescriptor,
    config: AllocatorConfig,
    slot_handlers: AHashMap<SizeKey, SlotHandler<B::Array>>,
    /// Default textures waiting for their key's slot handler
    default_textures: AHashMap<SizeKey, B::Source>,
    /// Placed defaults, always at slot 0
    default_slots: AHashMap<SizeKey, Slot>,
    primary_default: Option<SizeKey>,
}

impl<B: TextureArrayBackend> Handler<B> {
    /// Create a handler, placing the generated default before anyone else can allocate
    pub fn new(
        backend: &mut B,
        descriptor: HandlerDescriptor,
        config: AllocatorConfig,
    ) -> CoreResult<Self> {
        config.validate()?;

        let mut handler = Self {
            id: OwnerId::next(),
            descriptor,
            config,
            slot_handlers: AHashMap::new(),
            default_textures: AHashMap::new(),
            default_slots: AHashMap::new(),
            primary_default: None,
        };

        if let Some(color) = descriptor.default_color {
            let key = handler.config.default_key().with_variant(descriptor.variant);
            let info = TextureInfo::new(key.width, key.height, descriptor.format);
            let texture = backend.create_default(&info, color)?;
            handler.register_default(backend, key, texture)?;
            handler.get_or_create_slot_handler(backend, key)?;
        }

        Ok(handler)
    }

    /// Register a default texture for another resolution
    ///
    /// Must happen before the first allocation for `key`, so the default can
    /// take slot 0. The texture must have the channel's format and the size
    /// `key` describes.
    pub fn register_default(
        &mut self,
        backend: &B,
        key: SizeKey,
        texture: B::Source,
    ) -> CoreResult<()> {
        if self.slot_handlers.contains_key(&key) {
            return Err(CoreError::InvalidConfig(format!(
                "default for {} on {} registered after allocations started",
                key, self.descriptor.channel
            )));
        }

        let info = backend.describe(&texture);
        if info.format != self.descriptor.format || self.key_for(&info) != key {
            return Err(CoreError::InvalidConfig(format!(
                "{}x{} {:?} default does not match {} {:?} on {}",
                info.width,
                info.height,
                info.format,
                key,
                self.descriptor.format,
                self.descriptor.channel
            )));
        }

        self.default_textures.insert(key, texture);
        if self.primary_default.is_none() {
            self.primary_default = Some(key);
        }
        Ok(())
    }

    /// Look up the slot handler for `key`, creating it on first use
    ///
    /// A pending default for `key` is placed first. If placing it fails, no
    /// slot handler is stored and the default stays pending.
    pub fn get_or_create_slot_handler(
        &mut self,
        backend: &mut B,
        key: SizeKey,
    ) -> CoreResult<&mut SlotHandler<B::Array>> {
        match self.slot_handlers.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let capacity = self.config.capacity_for(&key);
                let descriptor = PageDescriptor::new(&key, self.descriptor.format, capacity);
                let mut slots =
                    SlotHandler::new(self.id, key, descriptor, self.config.max_pages_per_key);

                if let Some(texture) = self.default_textures.get(&key) {
                    let slot = slots.next_free_slot(backend)?;
                    let page = slots.page_mut(slot.page_index()).ok_or_else(|| {
                        CoreError::Backend(format!("page {} missing", slot.page_index()))
                    })?;
                    backend.copy_into(texture, page.array_mut(), slot.index())?;
                    debug_assert_eq!(slot.position(), (0, 0), "default must occupy slot 0");

                    log::debug!("Placed default for {} at {}", self.descriptor.channel, key);
                    self.default_textures.remove(&key);
                    self.default_slots.insert(key, slot);
                }

                Ok(entry.insert(slots))
            }
        }
    }

    /// Copy `item` into a free slot and bind it on `consumer`
    ///
    /// The returned slot is owned by the caller and must be freed later.
    pub fn set_item<C>(
        &mut self,
        backend: &mut B,
        consumer: &mut C,
        item: &B::Source,
        key: SizeKey,
    ) -> CoreResult<Slot>
    where
        C: SlotConsumer<B::Array>,
    {
        let properties = self.descriptor.properties;
        let slots = self.get_or_create_slot_handler(backend, key)?;
        let slot = slots.next_free_slot(backend)?;

        let copied = match slots.page_mut(slot.page_index()) {
            Some(page) => backend.copy_into(item, page.array_mut(), slot.index()),
            None => Err(CoreError::Backend(format!("page {} missing", slot.page_index()))),
        };
        if let Err(err) = copied {
            slots.free_slot(slot);
            return Err(err);
        }

        if let Some(page) = slots.page(slot.page_index()) {
            consumer.set_array(&properties.array, page);
            consumer.set_array_index(&properties.index, slot.index());
        }
        Ok(slot)
    }

    /// Bind the default texture for `key` (or the primary default) on `consumer`
    ///
    /// Nothing is allocated; the binding must not be freed. Returns `false`
    /// when the channel has no default.
    pub fn set_default_item<C>(&mut self, backend: &mut B, consumer: &mut C, key: SizeKey) -> bool
    where
        C: SlotConsumer<B::Array>,
    {
        if self.default_textures.contains_key(&key) {
            if let Err(err) = self.get_or_create_slot_handler(backend, key) {
                log::warn!(
                    "Failed to place default for {} at {}: {}",
                    self.descriptor.channel,
                    key,
                    err
                );
            }
        }

        let Some(slot) = self
            .default_slots
            .get(&key)
            .or_else(|| self.primary_default.and_then(|primary| self.default_slots.get(&primary)))
            .copied()
        else {
            log::debug!("No default texture for {}", self.descriptor.channel);
            return false;
        };

        let page = self.slot_handlers.get(&slot.key()).and_then(|s| s.page(slot.page_index()));
        let Some(page) = page else {
            return false;
        };

        let properties = &self.descriptor.properties;
        consumer.set_array(&properties.array, page);
        consumer.set_array_index(&properties.index, slot.index());
        true
    }

    /// Return an occupied slot to its free list
    pub fn free_slot(&mut self, slot: Slot) {
        debug_assert_eq!(slot.owner(), self.id, "slot freed into a foreign handler");

        let Some(slots) = self.slot_handlers.get_mut(&slot.key()) else {
            log::warn!(
                "Ignoring free of {:?}: no slot handler for {}",
                slot.position(),
                slot.key()
            );
            return;
        };

        if self.default_slots.get(&slot.key()) == Some(&slot) {
            log::debug!("Default for {} at {} released", self.descriptor.channel, slot.key());
            self.default_slots.remove(&slot.key());
            if self.primary_default == Some(slot.key()) {
                self.primary_default = None;
            }
        }

        slots.free_slot(slot);
    }

    /// Size key a texture with `info` is routed to
    pub fn key_for(&self, info: &TextureInfo) -> SizeKey {
        info.size_key(self.descriptor.variant)
    }

    /// Key of the default used when no source texture is available
    pub fn primary_default_key(&self) -> Option<SizeKey> {
        self.primary_default
    }

    /// The default slot for `key`, if placed
    pub fn default_slot(&self, key: &SizeKey) -> Option<Slot> {
        self.default_slots.get(key).copied()
    }

    pub fn id(&self) -> OwnerId {
        self.id
    }

    pub fn channel(&self) -> ChannelId {
        self.descriptor.channel
    }

    pub fn format(&self) -> PixelFormat {
        self.descriptor.format
    }

    pub fn properties(&self) -> &ArrayProperties {
        &self.descriptor.properties
    }

    pub fn slot_handler(&self, key: &SizeKey) -> Option<&SlotHandler<B::Array>> {
        self.slot_handlers.get(key)
    }

    pub fn stats(&self) -> HandlerStats {
        let mut slot_handlers: Vec<_> = self.slot_handlers.values().map(|s| s.stats()).collect();
        slot_handlers.sort_by_key(|s| s.key);

        HandlerStats {
            channel: self.descriptor.channel,
            format: self.descriptor.format,
            defaults: self.default_slots.len(),
            slot_handlers,
        }
    }
}
