// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-facing element adapters.
//!
//! The engine never touches native widgets directly. The host identifies
//! each widget with a [`WidgetId`] and supplies an [`ElementProvider`] that
//! wraps a widget in a [`WidgetElement`]: a selector-matching
//! [`Element`] that also exposes tree navigation and, optionally, the
//! [`Stylable`] capability.

use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;
use understory_css::{Element, StyleDeclaration};

use crate::engine::StyleEngine;

/// Host-assigned identity of a native widget.
///
/// Ids must stay unique for the lifetime of the widget; the host reports
/// their end through [`StyleEngine::handle_widget_disposed`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetId(u64);

impl WidgetId {
    /// Wraps a raw host identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw host identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WidgetId").field(&self.0).finish()
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WidgetId({})", self.0)
    }
}

/// An [`Element`] bound to a native widget.
pub trait WidgetElement: Element {
    /// The widget this element adapts.
    fn widget(&self) -> WidgetId;

    /// The parent widget, if any.
    fn parent_widget(&self) -> Option<WidgetId>;

    /// All child widgets, in order.
    fn children(&self) -> Vec<WidgetId>;

    /// The children currently visible, when the widget distinguishes them
    /// (for example a tab folder showing one page). `None` means "all".
    fn visible_children(&self) -> Option<Vec<WidgetId>> {
        None
    }

    /// The [`Stylable`] capability, if the element supports it.
    fn stylable(&self) -> Option<&dyn Stylable> {
        None
    }

    /// Widget type used to select type-specific handlers.
    fn widget_type(&self) -> &str {
        self.local_name()
    }
}

/// Optional element capability used by styling passes.
///
/// Only [`default_styles`](Self::default_styles) is required; the snapshot
/// accessors are derived from it.
pub trait Stylable {
    /// Storage for default-style snapshots.
    fn default_styles(&self) -> &DefaultStyles;

    /// Pseudo-instances styled on every pass (for example `hover`).
    fn static_pseudo_instances(&self) -> &[String] {
        &[]
    }

    /// Inline style text (the `style` attribute equivalent).
    fn inline_style(&self) -> Option<String> {
        None
    }

    /// Default-style snapshot for `pseudo`.
    fn default_style(&self, pseudo: Option<&str>) -> Option<StyleDeclaration> {
        self.default_styles().get(pseudo)
    }

    /// Replaces or clears the default-style snapshot for `pseudo`.
    fn set_default_style(&self, pseudo: Option<&str>, style: Option<StyleDeclaration>) {
        self.default_styles().set(pseudo, style);
    }

    /// Copies every snapshot of `other` into this element.
    fn copy_default_styles_from(&self, other: &dyn Stylable) {
        self.default_styles().copy_from(other.default_styles());
    }

    /// Called whenever the engine (re)binds this element to a widget.
    fn initialize(&self) {}

    /// Called after all `children` were styled in a recursive pass.
    fn on_children_styled(&self, _children: &[WidgetId]) {}

    /// Called once when the engine is disposed.
    fn dispose(&self) {}
}

/// Per-pseudo default-style snapshots.
#[derive(Debug, Default)]
pub struct DefaultStyles {
    snapshots: RefCell<HashMap<Option<String>, StyleDeclaration>>,
}

impl DefaultStyles {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for `pseudo`.
    #[must_use]
    pub fn get(&self, pseudo: Option<&str>) -> Option<StyleDeclaration> {
        self.snapshots
            .borrow()
            .get(&pseudo.map(str::to_owned))
            .cloned()
    }

    /// Replaces or clears the snapshot for `pseudo`.
    pub fn set(&self, pseudo: Option<&str>, style: Option<StyleDeclaration>) {
        let key = pseudo.map(str::to_owned);
        let mut snapshots = self.snapshots.borrow_mut();
        match style {
            Some(style) => {
                snapshots.insert(key, style);
            }
            None => {
                snapshots.remove(&key);
            }
        }
    }

    /// Copies every snapshot of `other`, replacing ones with the same key.
    pub fn copy_from(&self, other: &Self) {
        if core::ptr::eq(self, other) {
            return;
        }
        let copied = other.snapshots.borrow().clone();
        self.snapshots.borrow_mut().extend(copied);
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.borrow().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.borrow().is_empty()
    }
}

/// Maps widgets to elements.
///
/// Closures of the right shape implement this trait.
pub trait ElementProvider {
    /// Adapts `widget`, or returns `None` if the widget cannot be styled.
    fn element(&self, widget: WidgetId, engine: &StyleEngine) -> Option<Rc<dyn WidgetElement>>;

    /// Called once when the engine first creates a context for `widget`, so
    /// the binding can arrange for
    /// [`StyleEngine::handle_widget_disposed`] to be called.
    fn hook_widget(&self, _widget: WidgetId) {}
}

impl<F> ElementProvider for F
where
    F: Fn(WidgetId, &StyleEngine) -> Option<Rc<dyn WidgetElement>>,
{
    fn element(&self, widget: WidgetId, engine: &StyleEngine) -> Option<Rc<dyn WidgetElement>> {
        self(widget, engine)
    }
}
