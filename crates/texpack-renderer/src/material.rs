//! Material System
//!
//! Render-time materials receiving texture-array bindings.

use ahash::AHashMap;
use texpack_core::{ArrayProperties, Page, PageId, ShaderProperty, SlotConsumer};

/// Material property types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialProperty {
    /// Layer index inside the bound array
    Int(i32),
    /// Texture array page bound to the material
    TextureArray(PageId),
}

/// Material definition
#[derive(Debug, Clone)]
pub struct Material {
    /// Material name
    pub name: String,
    /// Shader name, also used to pick the material family
    pub shader: String,
    /// Material properties
    pub properties: AHashMap<String, MaterialProperty>,
}

impl Material {
    /// Create a new material
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            properties: AHashMap::new(),
        }
    }

    /// Set a property
    pub fn set_property(&mut self, name: impl Into<String>, value: MaterialProperty) {
        self.properties.insert(name.into(), value);
    }

    /// Get a property
    pub fn get_property(&self, name: &str) -> Option<&MaterialProperty> {
        self.properties.get(name)
    }

    /// Page and layer bound through the given property pair
    pub fn array_binding(&self, properties: &ArrayProperties) -> Option<(PageId, i32)> {
        let page = match self.get_property(properties.array.name())? {
            MaterialProperty::TextureArray(page) => *page,
            _ => return None,
        };
        let index = match self.get_property(properties.index.name())? {
            MaterialProperty::Int(index) => *index,
            _ => return None,
        };
        Some((page, index))
    }
}

impl<A> SlotConsumer<A> for Material {
    fn set_array(&mut self, property: &ShaderProperty, page: &Page<A>) {
        self.set_property(property.name(), MaterialProperty::TextureArray(page.id()));
    }

    fn set_array_index(&mut self, property: &ShaderProperty, index: u32) {
        self.set_property(property.name(), MaterialProperty::Int(index as i32));
    }
}
