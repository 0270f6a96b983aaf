// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A table-driven [`PropertyHandlerProvider`].

use core::fmt;
use std::rc::Rc;

use understory_css::StyleDeclaration;

use crate::element::WidgetElement;
use crate::engine::StyleEngine;
use crate::error::StyleError;
use crate::handler::{HandlerRef, PropertyHandlerProvider};

/// Widget type that matches every element.
pub const ANY_WIDGET_TYPE: &str = "*";

struct Registration {
    widget_type: String,
    property: String,
    handler: HandlerRef,
    deprecated: bool,
}

impl Registration {
    fn applies_to(&self, widget_type: &str) -> bool {
        self.widget_type == ANY_WIDGET_TYPE || self.widget_type == widget_type
    }
}

/// Handlers keyed by `(widget type, property)`.
///
/// Registration order is lookup order. Registrations under
/// [`ANY_WIDGET_TYPE`] apply to every element.
///
/// Default styles follow the snapshot algorithm: for each property of the
/// proposed declaration (or every supported property when there is none)
/// that is handled here and not yet snapshotted, the current native value
/// is read back through the engine; the values are parsed into a
/// declaration, merged over the previous snapshot and stored on the
/// element's [`Stylable`](crate::Stylable) capability.
#[derive(Default)]
pub struct TypedHandlerProvider {
    registrations: Vec<Registration>,
}

impl TypedHandlerProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `property` on widgets of `widget_type`.
    pub fn register(
        &mut self,
        widget_type: impl Into<String>,
        property: impl Into<String>,
        handler: impl Into<HandlerRef>,
    ) -> &mut Self {
        self.push(widget_type.into(), property.into(), handler.into(), false)
    }

    /// Registers a deprecated property; it is handled but only listed by
    /// [`properties`](PropertyHandlerProvider::properties) on request.
    pub fn register_deprecated(
        &mut self,
        widget_type: impl Into<String>,
        property: impl Into<String>,
        handler: impl Into<HandlerRef>,
    ) -> &mut Self {
        self.push(widget_type.into(), property.into(), handler.into(), true)
    }

    fn push(
        &mut self,
        widget_type: String,
        mut property: String,
        handler: HandlerRef,
        deprecated: bool,
    ) -> &mut Self {
        property.make_ascii_lowercase();
        self.registrations.push(Registration {
            widget_type,
            property,
            handler,
            deprecated,
        });
        self
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn handles(&self, widget_type: &str, property: &str) -> bool {
        self.registrations
            .iter()
            .any(|entry| entry.property == property && entry.applies_to(widget_type))
    }
}

impl PropertyHandlerProvider for TypedHandlerProvider {
    fn handlers_for(&self, element: &dyn WidgetElement, property: &str) -> Vec<HandlerRef> {
        let widget_type = element.widget_type();
        self.registrations
            .iter()
            .filter(|entry| entry.property == property && entry.applies_to(widget_type))
            .map(|entry| entry.handler.clone())
            .collect()
    }

    fn handlers(&self, property: &str) -> Vec<HandlerRef> {
        let mut handlers: Vec<HandlerRef> = Vec::new();
        for entry in self.registrations.iter().filter(|entry| entry.property == property) {
            if !handlers.iter().any(|known| known.ptr_eq(&entry.handler)) {
                handlers.push(entry.handler.clone());
            }
        }
        handlers
    }

    fn properties(&self, element: &dyn WidgetElement, include_deprecated: bool) -> Vec<String> {
        let widget_type = element.widget_type();
        let mut names: Vec<String> = self
            .registrations
            .iter()
            .filter(|entry| entry.applies_to(widget_type))
            .filter(|entry| include_deprecated || !entry.deprecated)
            .map(|entry| entry.property.clone())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    fn default_style_declaration(
        &self,
        engine: &StyleEngine,
        element: &Rc<dyn WidgetElement>,
        proposed: Option<&StyleDeclaration>,
        pseudo: Option<&str>,
    ) -> Result<Option<StyleDeclaration>, StyleError> {
        let Some(stylable) = element.stylable() else {
            return Ok(None);
        };
        let previous = stylable.default_style(pseudo);
        let Some(proposed) = proposed else {
            if previous.is_some() {
                return Ok(previous);
            }
            let names = self.properties(&**element, false);
            return self.snapshot(engine, element, names, None, pseudo);
        };
        let names = proposed.names().map(str::to_owned).collect();
        self.snapshot(engine, element, names, previous, pseudo)
    }
}

impl TypedHandlerProvider {
    fn snapshot(
        &self,
        engine: &StyleEngine,
        element: &Rc<dyn WidgetElement>,
        names: Vec<String>,
        previous: Option<StyleDeclaration>,
        pseudo: Option<&str>,
    ) -> Result<Option<StyleDeclaration>, StyleError> {
        let widget_type = element.widget_type();
        let mut retrieved = StyleDeclaration::new();
        for name in names {
            if previous
                .as_ref()
                .is_some_and(|previous| previous.property_value(&name).is_some())
            {
                continue;
            }
            if !self.handles(widget_type, &name) {
                continue;
            }
            let Some(text) = engine.retrieve_css_property(element.widget(), &name, pseudo) else {
                continue;
            };
            // A native value that does not parse only loses its own entry.
            match engine.parse_property_value(&text) {
                Ok(value) => retrieved.set_property(name, value),
                Err(error) => engine.handle_error(&error),
            }
        }
        if retrieved.is_empty() {
            return Ok(previous);
        }
        let mut snapshot = previous.unwrap_or_default();
        for declaration in &retrieved {
            snapshot.push(declaration.clone());
        }
        if let Some(stylable) = element.stylable() {
            stylable.set_default_style(pseudo, Some(snapshot.clone()));
        }
        Ok(Some(snapshot))
    }
}

impl fmt::Debug for TypedHandlerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for entry in &self.registrations {
            list.entry(&format_args!(
                "{} {}{}",
                entry.widget_type,
                entry.property,
                if entry.deprecated { " (deprecated)" } else { "" }
            ));
        }
        list.finish()
    }
}
