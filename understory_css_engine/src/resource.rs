// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Value → native resource conversion with memoization.
//!
//! Converters are registered per target [`TypeId`]. Converted resources are
//! cached in a [`ResourceRegistry`] under `(target, key)`, where the key is
//! the canonical CSS text of the value, so equal values share one native
//! resource. `inherit` has no key and is never cached.

use core::any::{Any, TypeId};
use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;
use understory_css::CssValue;

use crate::engine::StyleEngine;
use crate::error::StyleError;

/// Converts CSS values into native resources of one type.
pub trait ValueConverter {
    /// The type produced by [`convert`](Self::convert).
    fn target_type(&self) -> TypeId;

    /// Converts `value`; `Ok(None)` means the value does not denote a
    /// resource of this type.
    fn convert(
        &self,
        value: &CssValue,
        engine: &StyleEngine,
        context: Option<&dyn Any>,
    ) -> Result<Option<Rc<dyn Any>>, StyleError>;

    /// Serializes a native resource back to CSS text.
    fn to_css_text(
        &self,
        _resource: &dyn Any,
        _engine: &StyleEngine,
        _context: Option<&dyn Any>,
    ) -> Result<Option<String>, StyleError> {
        Ok(None)
    }
}

/// Storage for converted resources, keyed by `(target type, key)`.
///
/// Registries take `&self` so one registry can be shared between engines
/// on the same thread.
pub trait ResourceRegistry {
    /// The resource registered under `(target, key)`.
    fn resource(&self, target: TypeId, key: &str) -> Option<Rc<dyn Any>>;

    /// Registers `resource` under `(target, key)`.
    fn register_resource(&self, target: TypeId, key: &str, resource: Rc<dyn Any>);

    /// Releases every resource.
    fn dispose(&self);
}

/// In-memory [`ResourceRegistry`].
#[derive(Debug, Default)]
pub struct ResourceCache {
    resources: RefCell<HashMap<(TypeId, String), Rc<dyn Any>>>,
}

impl ResourceCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.borrow().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.borrow().is_empty()
    }
}

impl ResourceRegistry for ResourceCache {
    fn resource(&self, target: TypeId, key: &str) -> Option<Rc<dyn Any>> {
        self.resources
            .borrow()
            .get(&(target, key.to_owned()))
            .cloned()
    }

    fn register_resource(&self, target: TypeId, key: &str, resource: Rc<dyn Any>) {
        self.resources
            .borrow_mut()
            .insert((target, key.to_owned()), resource);
    }

    fn dispose(&self) {
        // Drop outside the borrow; resource destructors may call back in.
        let drained = core::mem::take(&mut *self.resources.borrow_mut());
        drop(drained);
    }
}

/// Cache key for `value`, or `None` for `inherit`.
///
/// Hex colors are case-folded so `#FFF` and `#fff` share a resource.
#[must_use]
pub fn resource_key(value: &CssValue) -> Option<String> {
    match value {
        CssValue::Inherit => None,
        CssValue::Hex(hex) => Some(format!("#{}", hex.to_ascii_lowercase())),
        other => Some(other.to_string()),
    }
}

/// Converter table plus the registry converted resources are memoized in.
pub struct ResourceConversionCache {
    converters: RefCell<HashMap<TypeId, Rc<dyn ValueConverter>>>,
    registry: Option<Rc<dyn ResourceRegistry>>,
}

impl ResourceConversionCache {
    /// Creates a cache memoizing into `registry`; `None` disables memoization.
    pub fn new(registry: Option<Rc<dyn ResourceRegistry>>) -> Self {
        Self {
            converters: RefCell::new(HashMap::new()),
            registry,
        }
    }

    /// The registry resources are memoized in.
    #[must_use]
    pub fn registry(&self) -> Option<&Rc<dyn ResourceRegistry>> {
        self.registry.as_ref()
    }

    /// Registers `converter` for its target type, replacing any previous one.
    pub fn register_converter(&self, converter: Rc<dyn ValueConverter>) {
        let target = converter.target_type();
        self.converters.borrow_mut().insert(target, converter);
    }

    /// Removes the converter for `target`.
    pub fn unregister_converter(&self, target: TypeId) -> Option<Rc<dyn ValueConverter>> {
        self.converters.borrow_mut().remove(&target)
    }

    /// The converter for `target`.
    #[must_use]
    pub fn converter(&self, target: TypeId) -> Option<Rc<dyn ValueConverter>> {
        self.converters.borrow().get(&target).cloned()
    }

    /// Converts `value` to a resource of type `target`.
    ///
    /// Returns the memoized resource when one is registered under
    /// `(target, key)`. Otherwise runs the converter and memoizes a
    /// non-`None` result. `Ok(None)` when no converter is registered.
    pub fn convert(
        &self,
        value: &CssValue,
        target: TypeId,
        engine: &StyleEngine,
        context: Option<&dyn Any>,
    ) -> Result<Option<Rc<dyn Any>>, StyleError> {
        let key = resource_key(value);
        if let (Some(key), Some(registry)) = (&key, &self.registry)
            && let Some(resource) = registry.resource(target, key)
        {
            return Ok(Some(resource));
        }
        let Some(converter) = self.converter(target) else {
            log::debug!("no value converter registered for {target:?}");
            return Ok(None);
        };
        let resource = converter.convert(value, engine, context)?;
        if let (Some(key), Some(registry), Some(resource)) = (&key, &self.registry, &resource) {
            registry.register_resource(target, key, resource.clone());
        }
        Ok(resource)
    }

    /// Serializes `resource` of type `target` back to CSS text.
    pub fn to_css_text(
        &self,
        resource: &dyn Any,
        target: TypeId,
        engine: &StyleEngine,
        context: Option<&dyn Any>,
    ) -> Result<Option<String>, StyleError> {
        match self.converter(target) {
            Some(converter) => converter.to_css_text(resource, engine, context),
            None => Ok(None),
        }
    }

    /// Releases the memoized resources.
    pub fn dispose(&self) {
        if let Some(registry) = &self.registry {
            registry.dispose();
        }
    }
}

impl fmt::Debug for ResourceConversionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceConversionCache")
            .field("converters", &self.converters.borrow().len())
            .field("has_registry", &self.registry.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_canonical_text() {
        assert_eq!(resource_key(&CssValue::Inherit), None);
        assert_eq!(
            resource_key(&CssValue::Hex("FFaa00".into())).as_deref(),
            Some("#ffaa00")
        );
        assert_eq!(
            resource_key(&CssValue::Dimension {
                value: 12.0,
                unit: "px".into()
            })
            .as_deref(),
            Some("12px")
        );
    }

    #[test]
    fn cache_round_trip_and_dispose() {
        let cache = ResourceCache::new();
        let target = TypeId::of::<u32>();
        cache.register_resource(target, "red", Rc::new(7_u32));
        assert!(cache.resource(TypeId::of::<i32>(), "red").is_none());
        let resource = cache.resource(target, "red").unwrap();
        assert_eq!(resource.downcast_ref::<u32>(), Some(&7));
        assert_eq!(cache.len(), 1);
        cache.dispose();
        assert!(cache.is_empty());
    }
}
