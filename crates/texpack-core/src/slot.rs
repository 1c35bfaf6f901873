//! Paging Slot Allocator
//!
//! Hands out `(page, index)` handles for one size bucket:
//! - Freed slots are recycled LIFO through a free list
//! - Fresh slots come from a monotonic counter, never rewound
//! - A new page is appended whenever the counter crosses a page boundary
//!
//! Slots carry indices rather than references; they are resolved through the
//! owning [`SlotHandler`].

use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;

use crate::backend::TextureArrayBackend;
use crate::key::SizeKey;
use crate::page::{Page, PageDescriptor};
use crate::{CoreError, CoreResult};

static NEXT_OWNER_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies the handler that owns a group of slot handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OwnerId(u32);

impl OwnerId {
    /// Allocate a fresh, process-unique owner id
    pub fn next() -> Self {
        Self(NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Handle to one item position inside a page
///
/// A slot does not own its page. Whoever receives an occupied slot must
/// free it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    owner: OwnerId,
    key: SizeKey,
    page: u32,
    index: u32,
}

impl Slot {
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn key(&self) -> SizeKey {
        self.key
    }

    /// Page position inside the owning slot handler
    pub fn page_index(&self) -> usize {
        self.page as usize
    }

    /// Layer inside the page
    pub fn index(&self) -> u32 {
        self.index
    }

    /// `(page, index)` pair, convenient for comparisons
    pub fn position(&self) -> (usize, u32) {
        (self.page_index(), self.index)
    }
}

/// Usage snapshot of a slot handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotHandlerStats {
    pub key: SizeKey,
    pub capacity_per_page: usize,
    pub pages: usize,
    pub allocated: usize,
    pub free: usize,
    pub high_water: usize,
}

/// Paging allocator for one size key
#[derive(Debug)]
pub struct SlotHandler<A> {
    owner: OwnerId,
    key: SizeKey,
    descriptor: PageDescriptor,
    /// Append-only page list
    pages: Vec<Page<A>>,
    /// Recycled slots, popped LIFO
    free_slots: Vec<Slot>,
    /// Never-yet-allocated position; never decremented
    next_free_index: usize,
    max_pages: Option<usize>,
}

impl<A> SlotHandler<A> {
    /// Create an empty slot handler. No page exists until the first allocation.
    pub fn new(
        owner: OwnerId,
        key: SizeKey,
        descriptor: PageDescriptor,
        max_pages: Option<usize>,
    ) -> Self {
        debug_assert!(descriptor.capacity > 0, "page capacity must be positive");

        Self {
            owner,
            key,
            descriptor,
            pages: Vec::new(),
            free_slots: Vec::new(),
            next_free_index: 0,
            max_pages,
        }
    }

    /// Get the next free slot, creating a page when the current one is full
    pub fn next_free_slot<B>(&mut self, backend: &mut B) -> CoreResult<Slot>
    where
        B: TextureArrayBackend<Array = A>,
    {
        if let Some(slot) = self.free_slots.pop() {
            log::trace!("Reusing slot {:?} for {}", slot.position(), self.key);
            return Ok(slot);
        }

        let capacity = self.descriptor.capacity;
        let page_index = self.next_free_index / capacity;
        let index_in_page = self.next_free_index % capacity;

        if page_index >= self.pages.len() {
            if let Some(max_pages) = self.max_pages {
                if self.pages.len() >= max_pages {
                    return Err(CoreError::CapacityExceeded {
                        key: self.key,
                        max_pages,
                    });
                }
            }

            let array = backend.create_array(&self.descriptor)?;
            let page = Page::new(self.descriptor, array);
            log::debug!(
                "Created {} for {} ({:?}, {} layers)",
                page.id(),
                self.key,
                self.descriptor.format,
                capacity
            );
            self.pages.push(page);
        }

        self.next_free_index += 1;

        Ok(Slot {
            owner: self.owner,
            key: self.key,
            page: page_index as u32,
            index: index_in_page as u32,
        })
    }

    /// Return a slot to the free list
    ///
    /// Foreign and double-freed slots are caller contract violations, only
    /// checked in debug builds.
    pub fn free_slot(&mut self, slot: Slot) {
        debug_assert_eq!(slot.owner, self.owner, "slot freed into a foreign handler");
        debug_assert_eq!(slot.key, self.key, "slot freed into the wrong size bucket");
        debug_assert!(
            slot.page_index() * self.descriptor.capacity + (slot.index as usize)
                < self.next_free_index,
            "freeing a slot that was never allocated: {:?}",
            slot.position()
        );
        debug_assert!(
            !self.free_slots.contains(&slot),
            "double free of slot {:?}",
            slot.position()
        );

        log::trace!("Freed slot {:?} for {}", slot.position(), self.key);
        self.free_slots.push(slot);
    }

    pub fn key(&self) -> SizeKey {
        self.key
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn descriptor(&self) -> &PageDescriptor {
        &self.descriptor
    }

    pub fn capacity_per_page(&self) -> usize {
        self.descriptor.capacity
    }

    pub fn page(&self, index: usize) -> Option<&Page<A>> {
        self.pages.get(index)
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut Page<A>> {
        self.pages.get_mut(index)
    }

    pub fn pages(&self) -> &[Page<A>] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn next_free_index(&self) -> usize {
        self.next_free_index
    }

    pub fn free_count(&self) -> usize {
        self.free_slots.len()
    }

    /// Slots currently handed out
    pub fn allocated_count(&self) -> usize {
        self.next_free_index - self.free_slots.len()
    }

    pub fn stats(&self) -> SlotHandlerStats {
        SlotHandlerStats {
            key: self.key,
            capacity_per_page: self.descriptor.capacity,
            pages: self.pages.len(),
            allocated: self.allocated_count(),
            free: self.free_slots.len(),
            high_water: self.next_free_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{PixelFormat, TextureInfo};

    /// Backend that only counts created arrays
    #[derive(Default)]
    struct CountingBackend {
        arrays_created: usize,
    }

    impl TextureArrayBackend for CountingBackend {
        type Source = ();
        type Array = usize;

        fn describe(&self, _source: &()) -> TextureInfo {
            TextureInfo::new(4, 4, PixelFormat::Rgba8Unorm)
        }

        fn create_array(&mut self, _descriptor: &PageDescriptor) -> CoreResult<usize> {
            self.arrays_created += 1;
            Ok(self.arrays_created)
        }

        fn copy_into(&mut self, _source: &(), _target: &mut usize, _layer: u32) -> CoreResult<()> {
            Ok(())
        }

        fn create_default(&mut self, _info: &TextureInfo, _color: [u8; 4]) -> CoreResult<()> {
            Ok(())
        }
    }

    fn handler(capacity: usize) -> SlotHandler<usize> {
        let key = SizeKey::square(4);
        SlotHandler::new(
            OwnerId::next(),
            key,
            PageDescriptor::new(&key, PixelFormat::Rgba8Unorm, capacity),
            None,
        )
    }

    #[test]
    fn test_lazy_page_creation() {
        let mut backend = CountingBackend::default();
        let mut slots = handler(4);
        assert_eq!(slots.page_count(), 0);

        let slot = slots.next_free_slot(&mut backend).unwrap();
        assert_eq!(slot.position(), (0, 0));
        assert_eq!(slots.page_count(), 1);
        assert_eq!(backend.arrays_created, 1);
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut backend = CountingBackend::default();
        let mut slots = handler(8);

        let a = slots.next_free_slot(&mut backend).unwrap();
        let b = slots.next_free_slot(&mut backend).unwrap();
        slots.free_slot(a);
        slots.free_slot(b);

        assert_eq!(slots.next_free_slot(&mut backend).unwrap(), b);
        assert_eq!(slots.next_free_slot(&mut backend).unwrap(), a);
    }

    #[test]
    fn test_single_slot_round_trip() {
        let mut backend = CountingBackend::default();
        let mut slots = handler(8);
        slots.next_free_slot(&mut backend).unwrap();

        let slot = slots.next_free_slot(&mut backend).unwrap();
        let position = slot.position();
        slots.free_slot(slot);

        assert_eq!(slots.next_free_slot(&mut backend).unwrap().position(), position);
    }

    #[test]
    fn test_capacity_rollover() {
        let mut backend = CountingBackend::default();
        let capacity = 5;
        let mut slots = handler(capacity);

        let allocated: Vec<_> = (0..=capacity)
            .map(|_| slots.next_free_slot(&mut backend).unwrap())
            .collect();

        assert_eq!(slots.page_count(), 2);
        assert_eq!(allocated[capacity].position(), (1, 0));
        assert_eq!(allocated[capacity - 1].position(), (0, capacity as u32 - 1));
    }

    #[test]
    fn test_monotonic_growth() {
        let mut backend = CountingBackend::default();
        let mut slots = handler(2);
        let mut last_index = 0;
        let mut last_pages = 0;
        let mut held = Vec::new();

        for step in 0..40 {
            if step % 3 == 2 {
                if let Some(slot) = held.pop() {
                    slots.free_slot(slot);
                }
            } else {
                held.push(slots.next_free_slot(&mut backend).unwrap());
            }

            assert!(slots.next_free_index() >= last_index);
            assert!(slots.page_count() >= last_pages);
            last_index = slots.next_free_index();
            last_pages = slots.page_count();
        }

        assert_eq!(slots.allocated_count(), held.len());
    }

    #[test]
    fn test_paging_scenario() {
        let mut backend = CountingBackend::default();
        let mut slots = handler(2);

        let s0 = slots.next_free_slot(&mut backend).unwrap();
        let s1 = slots.next_free_slot(&mut backend).unwrap();
        let s2 = slots.next_free_slot(&mut backend).unwrap();
        assert_eq!(s0.position(), (0, 0));
        assert_eq!(s1.position(), (0, 1));
        assert_eq!(s2.position(), (1, 0));

        slots.free_slot(s0);
        let s3 = slots.next_free_slot(&mut backend).unwrap();
        assert_eq!(s3.position(), (0, 0));

        let s4 = slots.next_free_slot(&mut backend).unwrap();
        assert_eq!(s4.position(), (1, 1));
        assert_eq!(slots.page_count(), 2);
    }

    #[test]
    fn test_deterministic_assignment() {
        let run = || {
            let mut backend = CountingBackend::default();
            let mut slots = handler(3);
            let mut positions = Vec::new();
            let mut held = Vec::new();
            for step in 0..20 {
                if step % 4 == 3 {
                    let slot: Slot = held.remove(0);
                    slots.free_slot(slot);
                } else {
                    let slot = slots.next_free_slot(&mut backend).unwrap();
                    positions.push(slot.position());
                    held.push(slot);
                }
            }
            positions
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_page_cap() {
        let mut backend = CountingBackend::default();
        let key = SizeKey::square(4);
        let mut slots: SlotHandler<usize> = SlotHandler::new(
            OwnerId::next(),
            key,
            PageDescriptor::new(&key, PixelFormat::Rgba8Unorm, 2),
            Some(1),
        );

        let first = slots.next_free_slot(&mut backend).unwrap();
        slots.next_free_slot(&mut backend).unwrap();

        let err = slots.next_free_slot(&mut backend).unwrap_err();
        assert_eq!(err, CoreError::CapacityExceeded { key, max_pages: 1 });

        // Recycled slots are still available at the cap
        slots.free_slot(first);
        assert_eq!(slots.next_free_slot(&mut backend).unwrap(), first);
    }

    #[test]
    fn test_stats() {
        let mut backend = CountingBackend::default();
        let mut slots = handler(2);
        let a = slots.next_free_slot(&mut backend).unwrap();
        slots.next_free_slot(&mut backend).unwrap();
        slots.next_free_slot(&mut backend).unwrap();
        slots.free_slot(a);

        let stats = slots.stats();
        assert_eq!(stats.pages, 2);
        assert_eq!(stats.allocated, 2);
        assert_eq!(stats.free, 1);
        assert_eq!(stats.high_water, 3);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "double free")]
    fn test_double_free_is_caught_in_debug() {
        let mut backend = CountingBackend::default();
        let mut slots = handler(2);
        let slot = slots.next_free_slot(&mut backend).unwrap();
        slots.free_slot(slot);
        slots.free_slot(slot);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "foreign handler")]
    fn test_foreign_free_is_caught_in_debug() {
        let mut backend = CountingBackend::default();
        let mut first = handler(2);
        let mut second = handler(2);
        let slot = first.next_free_slot(&mut backend).unwrap();
        second.next_free_slot(&mut backend).unwrap();
        second.free_slot(slot);
    }
}
