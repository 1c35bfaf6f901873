//! Texture array pages
//!
//! A page is one fixed-capacity array resource holding equally sized items.
//! Pages are never resized; a full page makes the owner append another one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::key::{PixelFormat, SizeKey};

static NEXT_PAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique page identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PageId(u64);

impl PageId {
    fn next() -> Self {
        Self(NEXT_PAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// Shape of a page's backing array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Items (array layers) per page
    pub capacity: usize,
}

impl PageDescriptor {
    pub fn new(key: &SizeKey, format: PixelFormat, capacity: usize) -> Self {
        Self {
            width: key.width,
            height: key.height,
            format,
            capacity,
        }
    }

    /// Bytes of one layer
    pub fn layer_size(&self) -> usize {
        self.format.layer_size(self.width, self.height)
    }
}

/// One backend array resource plus its shape
#[derive(Debug)]
pub struct Page<A> {
    id: PageId,
    descriptor: PageDescriptor,
    array: A,
}

impl<A> Page<A> {
    pub(crate) fn new(descriptor: PageDescriptor, array: A) -> Self {
        Self {
            id: PageId::next(),
            descriptor,
            array,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn descriptor(&self) -> &PageDescriptor {
        &self.descriptor
    }

    pub fn capacity(&self) -> usize {
        self.descriptor.capacity
    }

    /// The backend resource
    pub fn array(&self) -> &A {
        &self.array
    }

    pub fn array_mut(&mut self) -> &mut A {
        &mut self.array
    }
}
