// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property handlers and the registry that resolves them.
//!
//! A [`PropertyHandler`] applies one CSS property to a native widget and can
//! read the current native value back as CSS text. Optional facets are
//! bundled next to it in a [`HandlerRef`]:
//!
//! - [`CompositePropertyHandler`]: expands a shorthand into its longhands.
//! - [`TwoPhaseHandler`]: gets one callback after a whole declaration block
//!   was applied, so it can commit coupled properties together.
//!
//! Handlers are grouped by [`PropertyHandlerProvider`]s, which the
//! [`PropertyHandlerRegistry`] consults in registration order.

use core::fmt;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use understory_css::{CssValue, StyleDeclaration};

use crate::element::WidgetElement;
use crate::engine::StyleEngine;
use crate::error::StyleError;

/// Applies and retrieves one or more CSS properties.
pub trait PropertyHandler {
    /// Applies `value` for `property` to `element`.
    ///
    /// `value` is `None` when the declaration said `inherit` and the parent
    /// had no value to inherit. Returns `Ok(true)` to claim the property for
    /// the rest of the pass, `Ok(false)` to let the next handler try.
    fn apply_property(
        &self,
        element: &Rc<dyn WidgetElement>,
        property: &str,
        value: Option<&CssValue>,
        pseudo: Option<&str>,
        engine: &StyleEngine,
    ) -> Result<bool, StyleError>;

    /// Reads the current native value of `property` as CSS text.
    fn retrieve_property(
        &self,
        _element: &Rc<dyn WidgetElement>,
        _property: &str,
        _pseudo: Option<&str>,
        _engine: &StyleEngine,
    ) -> Result<Option<String>, StyleError> {
        Ok(None)
    }
}

/// Shorthand expansion facet.
pub trait CompositePropertyHandler {
    /// Returns `true` if `property` is a shorthand this handler expands.
    fn is_composite(&self, property: &str) -> bool;

    /// The longhand properties `property` expands to.
    fn composite_property_names(&self, property: &str) -> Vec<String>;
}

/// Post-block callback facet.
pub trait TwoPhaseHandler {
    /// Called once after every property of a declaration block was applied,
    /// if this handler claimed at least one of them.
    fn on_all_properties_applied(
        &self,
        element: &Rc<dyn WidgetElement>,
        engine: &StyleEngine,
    ) -> Result<(), StyleError>;
}

bitflags::bitflags! {
    /// Facets carried by a [`HandlerRef`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct HandlerCapabilities: u8 {
        /// Expands shorthands.
        const COMPOSITE = 0b0000_0001;
        /// Implements [`TwoPhaseHandler`] itself.
        const TWO_PHASE = 0b0000_0010;
        /// Forwards the post-block callback to an inner two-phase handler.
        const DELEGATE  = 0b0000_0100;
    }
}

/// A handler together with its optional facets.
#[derive(Clone)]
pub struct HandlerRef {
    handler: Rc<dyn PropertyHandler>,
    composite: Option<Rc<dyn CompositePropertyHandler>>,
    two_phase: Option<Rc<dyn TwoPhaseHandler>>,
    capabilities: HandlerCapabilities,
}

impl HandlerRef {
    /// Wraps a plain handler.
    pub fn new(handler: Rc<dyn PropertyHandler>) -> Self {
        Self {
            handler,
            composite: None,
            two_phase: None,
            capabilities: HandlerCapabilities::empty(),
        }
    }

    /// Wraps a handler that also implements [`TwoPhaseHandler`].
    pub fn two_phase<H>(handler: Rc<H>) -> Self
    where
        H: PropertyHandler + TwoPhaseHandler + 'static,
    {
        let mut this = Self::new(handler.clone());
        this.two_phase = Some(handler);
        this.capabilities |= HandlerCapabilities::TWO_PHASE;
        this
    }

    /// Wraps a handler that also implements [`CompositePropertyHandler`].
    pub fn composite<H>(handler: Rc<H>) -> Self
    where
        H: PropertyHandler + CompositePropertyHandler + 'static,
    {
        Self::new(handler.clone()).with_composite(handler)
    }

    /// Adds a shorthand-expansion facet.
    #[must_use]
    pub fn with_composite(mut self, composite: Rc<dyn CompositePropertyHandler>) -> Self {
        self.composite = Some(composite);
        self.capabilities |= HandlerCapabilities::COMPOSITE;
        self
    }

    /// Forwards the post-block callback to `inner`.
    #[must_use]
    pub fn delegating_to(mut self, inner: Rc<dyn TwoPhaseHandler>) -> Self {
        self.two_phase = Some(inner);
        self.capabilities.remove(HandlerCapabilities::TWO_PHASE);
        self.capabilities |= HandlerCapabilities::DELEGATE;
        self
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &Rc<dyn PropertyHandler> {
        &self.handler
    }

    /// The shorthand facet, if any.
    #[must_use]
    pub fn composite_facet(&self) -> Option<&Rc<dyn CompositePropertyHandler>> {
        self.composite.as_ref()
    }

    /// The two-phase handler to notify after a block, own or delegated.
    #[must_use]
    pub fn two_phase_facet(&self) -> Option<&Rc<dyn TwoPhaseHandler>> {
        self.two_phase.as_ref()
    }

    /// Facets present on this handler.
    #[must_use]
    pub fn capabilities(&self) -> HandlerCapabilities {
        self.capabilities
    }

    /// Returns `true` if both refer to the same handler.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.handler, &other.handler)
    }
}

impl<H: PropertyHandler + 'static> From<Rc<H>> for HandlerRef {
    fn from(handler: Rc<H>) -> Self {
        Self::new(handler)
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRef")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// A group of handlers, typically for one widget toolkit.
pub trait PropertyHandlerProvider {
    /// Handlers for `property` on `element`, in the order they should be tried.
    fn handlers_for(&self, element: &dyn WidgetElement, property: &str) -> Vec<HandlerRef>;

    /// Handlers for `property` on any element.
    fn handlers(&self, property: &str) -> Vec<HandlerRef>;

    /// Names of the properties supported on `element`.
    fn properties(&self, element: &dyn WidgetElement, include_deprecated: bool) -> Vec<String>;

    /// Computes the default-style snapshot for `element` in `pseudo`.
    ///
    /// `proposed` is the declaration about to be applied, if any.
    fn default_style_declaration(
        &self,
        _engine: &StyleEngine,
        _element: &Rc<dyn WidgetElement>,
        _proposed: Option<&StyleDeclaration>,
        _pseudo: Option<&str>,
    ) -> Result<Option<StyleDeclaration>, StyleError> {
        Ok(None)
    }
}

/// Ordered list of [`PropertyHandlerProvider`]s.
///
/// Every query works on a snapshot of the list, so providers may register
/// or unregister providers while being consulted.
#[derive(Default)]
pub struct PropertyHandlerRegistry {
    providers: RefCell<Vec<Rc<dyn PropertyHandlerProvider>>>,
}

impl PropertyHandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `provider`; earlier providers are consulted first.
    pub fn register(&self, provider: Rc<dyn PropertyHandlerProvider>) {
        self.providers.borrow_mut().push(provider);
    }

    /// Removes `provider`; returns `false` if it was not registered.
    pub fn unregister(&self, provider: &Rc<dyn PropertyHandlerProvider>) -> bool {
        let mut providers = self.providers.borrow_mut();
        let before = providers.len();
        providers.retain(|registered| !Rc::ptr_eq(registered, provider));
        providers.len() != before
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.borrow().len()
    }

    /// Returns `true` if no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.borrow().is_empty()
    }

    /// Snapshot of the registered providers.
    #[must_use]
    pub fn providers(&self) -> Vec<Rc<dyn PropertyHandlerProvider>> {
        self.providers.borrow().clone()
    }

    /// Candidate handlers for `property` on `element`, across providers.
    #[must_use]
    pub fn handlers_for(&self, element: &dyn WidgetElement, property: &str) -> Vec<HandlerRef> {
        self.providers()
            .iter()
            .flat_map(|provider| provider.handlers_for(element, property))
            .collect()
    }

    /// Candidate handlers for `property` regardless of element.
    #[must_use]
    pub fn handlers(&self, property: &str) -> Vec<HandlerRef> {
        self.providers()
            .iter()
            .flat_map(|provider| provider.handlers(property))
            .collect()
    }

    /// Sorted union of the property names supported on `element`.
    #[must_use]
    pub fn properties(&self, element: &dyn WidgetElement, include_deprecated: bool) -> Vec<String> {
        let names: BTreeSet<String> = self
            .providers()
            .iter()
            .flat_map(|provider| provider.properties(element, include_deprecated))
            .collect();
        names.into_iter().collect()
    }

    /// Longhands of the shorthand `property`, from the first handler that
    /// expands it.
    #[must_use]
    pub fn composite_property_names(&self, property: &str) -> Option<Vec<String>> {
        self.handlers(property).into_iter().find_map(|handler| {
            handler
                .composite_facet()
                .filter(|composite| composite.is_composite(property))
                .map(|composite| composite.composite_property_names(property))
        })
    }

    /// Asks every provider for a default-style snapshot.
    ///
    /// Each non-`None` answer replaces the previous one, so the last
    /// provider with an answer wins. Failures go to the engine's error
    /// handler and are skipped.
    pub fn compute_default_style_declaration(
        &self,
        engine: &StyleEngine,
        element: &Rc<dyn WidgetElement>,
        proposed: Option<&StyleDeclaration>,
        pseudo: Option<&str>,
    ) -> Option<StyleDeclaration> {
        let mut computed = None;
        for provider in self.providers() {
            match provider.default_style_declaration(engine, element, proposed, pseudo) {
                Ok(Some(style)) => computed = Some(style),
                Ok(None) => {}
                Err(error) => engine.handle_error(&error),
            }
        }
        computed
    }
}

impl fmt::Debug for PropertyHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyHandlerRegistry")
            .field("providers", &self.len())
            .finish()
    }
}
