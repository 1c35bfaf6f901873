//! Container Registry
//!
//! One container per material family, built lazily and never rebuilt. The
//! registry is an explicit object owned by the caller; containers are shared
//! behind a mutex so consumers on other threads serialize their access.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use texpack_core::{AllocatorConfig, CoreResult, TextureArrayBackend};

use crate::container::Container;
use crate::family::MaterialFamily;

/// Container shared between consumers
pub type SharedContainer<B> = Arc<Mutex<Container<B>>>;

/// Registry of per-family containers
pub struct ContainerRegistry<B: TextureArrayBackend> {
    config: AllocatorConfig,
    containers: AHashMap<MaterialFamily, SharedContainer<B>>,
}

impl<B: TextureArrayBackend> ContainerRegistry<B> {
    /// Create an empty registry
    pub fn new(config: AllocatorConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            containers: AHashMap::new(),
        })
    }

    /// Cached container for the family selected by `shader`
    pub fn get_cached(&mut self, backend: &mut B, shader: &str) -> CoreResult<SharedContainer<B>> {
        self.get_cached_family(backend, MaterialFamily::from_shader_name(shader))
    }

    /// Cached container for `family`, built on first access
    pub fn get_cached_family(
        &mut self,
        backend: &mut B,
        family: MaterialFamily,
    ) -> CoreResult<SharedContainer<B>> {
        if let Some(container) = self.containers.get(&family) {
            return Ok(Arc::clone(container));
        }

        let container = Container::from_family(backend, family, &self.config)?;
        let container = Arc::new(Mutex::new(container));
        self.containers.insert(family, Arc::clone(&container));
        log::info!("Registered {} texture array container", family);
        Ok(container)
    }

    /// Fresh, uncached container for the family selected by `shader`
    pub fn create(&self, backend: &mut B, shader: &str) -> CoreResult<Container<B>> {
        Container::from_family(backend, MaterialFamily::from_shader_name(shader), &self.config)
    }

    pub fn is_cached(&self, family: MaterialFamily) -> bool {
        self.containers.contains_key(&family)
    }

    pub fn cached_count(&self) -> usize {
        self.containers.len()
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuBackend;

    fn registry() -> ContainerRegistry<CpuBackend> {
        let config = AllocatorConfig {
            min_array_size: 4,
            default_resolution: 4,
            ..AllocatorConfig::default()
        };
        ContainerRegistry::new(config).unwrap()
    }

    #[test]
    fn test_lazy_and_cached() {
        let mut backend = CpuBackend::new();
        let mut registry = registry();
        assert_eq!(registry.cached_count(), 0);

        let first = registry.get_cached(&mut backend, "DCL/Scene").unwrap();
        let arrays = backend.arrays_created();
        let second = registry.get_cached(&mut backend, "DCL/Scene").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.arrays_created(), arrays);
        assert!(registry.is_cached(MaterialFamily::Pbr));
        assert!(!registry.is_cached(MaterialFamily::Toon));
    }

    #[test]
    fn test_unknown_selector_shares_default_family() {
        let mut backend = CpuBackend::new();
        let mut registry = registry();

        let pbr = registry.get_cached(&mut backend, "DCL/Scene").unwrap();
        let unknown = registry.get_cached(&mut backend, "Legacy/Unlit").unwrap();
        assert!(Arc::ptr_eq(&pbr, &unknown));
        assert_eq!(registry.cached_count(), 1);
    }

    #[test]
    fn test_families_are_distinct() {
        let mut backend = CpuBackend::new();
        let mut registry = registry();

        let pbr = registry.get_cached_family(&mut backend, MaterialFamily::Pbr).unwrap();
        let toon = registry.get_cached_family(&mut backend, MaterialFamily::Toon).unwrap();
        assert!(!Arc::ptr_eq(&pbr, &toon));
        assert_eq!(toon.lock().family(), MaterialFamily::Toon);
    }

    #[test]
    fn test_create_is_uncached() {
        let mut backend = CpuBackend::new();
        let mut registry = registry();

        let fresh = registry.create(&mut backend, "DCL/DCL_Toon").unwrap();
        assert_eq!(fresh.family(), MaterialFamily::Toon);
        assert_eq!(registry.cached_count(), 0);

        let cached = registry.get_cached(&mut backend, "DCL/DCL_Toon").unwrap();
        assert_ne!(cached.lock().handler(0).unwrap().id(), fresh.handler(0).unwrap().id());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AllocatorConfig {
            non_square_divisor: 0,
            ..AllocatorConfig::default()
        };
        assert!(ContainerRegistry::<CpuBackend>::new(config).is_err());
    }
}
