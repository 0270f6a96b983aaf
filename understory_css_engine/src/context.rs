// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-widget bookkeeping.
//!
//! An [`ElementContext`] remembers which element adapter was produced for a
//! widget and by which provider. The [`ElementContextRegistry`] holds at most
//! one context per live widget; it stores ids and adapters, never widgets.

use core::any::Any;
use core::fmt;
use std::rc::Rc;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use crate::element::{ElementProvider, WidgetElement, WidgetId};

/// Bookkeeping for one widget.
#[derive(Clone)]
pub struct ElementContext {
    element: Rc<dyn WidgetElement>,
    provider: Option<Rc<dyn ElementProvider>>,
    data: HashMap<String, Rc<dyn Any>>,
}

impl ElementContext {
    fn new(element: Rc<dyn WidgetElement>, provider: Option<Rc<dyn ElementProvider>>) -> Self {
        Self {
            element,
            provider,
            data: HashMap::new(),
        }
    }

    /// The element adapter currently bound to the widget.
    #[must_use]
    pub fn element(&self) -> &Rc<dyn WidgetElement> {
        &self.element
    }

    /// The provider that produced [`element`](Self::element).
    #[must_use]
    pub fn provider(&self) -> Option<&Rc<dyn ElementProvider>> {
        self.provider.as_ref()
    }

    /// Returns `true` if `active` is not the provider this context was
    /// created with.
    #[must_use]
    pub fn must_be_refreshed(&self, active: Option<&Rc<dyn ElementProvider>>) -> bool {
        !same_provider(self.provider.as_ref(), active)
    }

    /// Opaque data stored under `key`.
    #[must_use]
    pub fn data(&self, key: &str) -> Option<&Rc<dyn Any>> {
        self.data.get(key)
    }

    /// Stores opaque data under `key`, returning the previous value.
    pub fn set_data(&mut self, key: impl Into<String>, value: Rc<dyn Any>) -> Option<Rc<dyn Any>> {
        self.data.insert(key.into(), value)
    }

    /// Removes the data stored under `key`.
    pub fn remove_data(&mut self, key: &str) -> Option<Rc<dyn Any>> {
        self.data.remove(key)
    }

    /// Notifies the element's [`Stylable`](crate::Stylable) capability that
    /// the engine is going away.
    pub fn dispose(&self) {
        if let Some(stylable) = self.element.stylable() {
            stylable.dispose();
        }
    }
}

impl fmt::Debug for ElementContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementContext")
            .field("widget", &self.element.widget())
            .field("has_provider", &self.provider.is_some())
            .field("data_keys", &self.data.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn same_provider(
    a: Option<&Rc<dyn ElementProvider>>,
    b: Option<&Rc<dyn ElementProvider>>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Outcome of [`ElementContextRegistry::bind`].
#[derive(Clone)]
pub enum Binding {
    /// No context existed; one was created.
    Created,
    /// An existing context was pointed at a new element; holds the element
    /// it replaced.
    Refreshed(Rc<dyn WidgetElement>),
}

impl Binding {
    /// Copies default-style snapshots from the replaced element to
    /// `current` when both are stylable.
    ///
    /// Runs host code; call it with no registry borrow held.
    pub fn carry_default_styles(&self, current: &Rc<dyn WidgetElement>) {
        if let Self::Refreshed(previous) = self
            && !Rc::ptr_eq(previous, current)
            && let (Some(old), Some(new)) = (previous.stylable(), current.stylable())
        {
            new.copy_default_styles_from(old);
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("Created"),
            Self::Refreshed(previous) => f
                .debug_tuple("Refreshed")
                .field(&previous.widget())
                .finish(),
        }
    }
}

/// Widget → [`ElementContext`] map.
#[derive(Default)]
pub struct ElementContextRegistry {
    contexts: HashMap<WidgetId, ElementContext>,
}

impl ElementContextRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Returns `true` if no context is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Returns `true` if `widget` has a context.
    #[must_use]
    pub fn contains(&self, widget: WidgetId) -> bool {
        self.contexts.contains_key(&widget)
    }

    /// The context of `widget`, without creating one.
    #[must_use]
    pub fn get(&self, widget: WidgetId) -> Option<&ElementContext> {
        self.contexts.get(&widget)
    }

    /// Mutable access to the context of `widget`.
    pub fn get_mut(&mut self, widget: WidgetId) -> Option<&mut ElementContext> {
        self.contexts.get_mut(&widget)
    }

    /// Binds `element` to `widget`.
    ///
    /// Creates the context on a miss. Otherwise swaps the element in and
    /// records `provider`; opaque data is kept. The replaced element is
    /// handed back in [`Binding::Refreshed`] so the caller can carry its
    /// default styles forward once this borrow is released.
    pub fn bind(
        &mut self,
        widget: WidgetId,
        element: Rc<dyn WidgetElement>,
        provider: Option<Rc<dyn ElementProvider>>,
    ) -> Binding {
        match self.contexts.entry(widget) {
            Entry::Occupied(mut occupied) => {
                let context = occupied.get_mut();
                let previous = core::mem::replace(&mut context.element, element);
                context.provider = provider;
                Binding::Refreshed(previous)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ElementContext::new(element, provider));
                Binding::Created
            }
        }
    }

    /// Removes the context of `widget`.
    pub fn remove(&mut self, widget: WidgetId) -> Option<ElementContext> {
        self.contexts.remove(&widget)
    }

    /// Removes and returns every context.
    pub fn drain(&mut self) -> Vec<ElementContext> {
        self.contexts.drain().map(|(_, context)| context).collect()
    }
}

impl fmt::Debug for ElementContextRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementContextRegistry")
            .field("len", &self.contexts.len())
            .finish()
    }
}
