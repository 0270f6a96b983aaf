// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory CSS Engine: apply cascaded CSS to native widget trees.
//!
//! The engine sits between a CSS model (`understory_css`) and a native
//! widget toolkit. The toolkit side is plugged in through traits:
//!
//! - [`ElementProvider`] adapts a widget (named by a host-assigned
//!   [`WidgetId`]) into a [`WidgetElement`] that selectors can match.
//! - [`PropertyHandlerProvider`]s supply [`PropertyHandler`]s that push CSS
//!   values into widgets and read native values back.
//! - [`ValueConverter`]s turn CSS values into native resources (colors,
//!   fonts, images); results are memoized in a [`ResourceRegistry`].
//!
//! ## Styling a tree
//!
//! [`StyleEngine::apply_styles`] resolves the element for a widget, asks the
//! cascade for its declarations (base and one per static pseudo-instance
//! such as `hover`), dispatches every property to the first handler that
//! claims it, applies inline style text, then recurses into the visible
//! children.
//!
//! Within one outer [`StyleEngine::apply_style_declaration`] call every
//! property is applied at most once, even when a handler applies further
//! declarations from inside its callback. Handlers that need to see the
//! whole block before committing implement [`TwoPhaseHandler`].
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use understory_css::{CssValue, Element};
//! use understory_css_engine::{
//!     HandlerRef, PropertyHandler, StyleEngine, StyleError, TypedHandlerProvider, WidgetElement,
//!     WidgetId,
//! };
//!
//! struct Label;
//!
//! impl Element for Label {
//!     fn local_name(&self) -> &str {
//!         "Label"
//!     }
//!     fn parent_element(&self) -> Option<Rc<dyn Element>> {
//!         None
//!     }
//! }
//!
//! impl WidgetElement for Label {
//!     fn widget(&self) -> WidgetId {
//!         WidgetId::new(1)
//!     }
//!     fn parent_widget(&self) -> Option<WidgetId> {
//!         None
//!     }
//!     fn children(&self) -> Vec<WidgetId> {
//!         Vec::new()
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Color(RefCell<Option<String>>);
//!
//! impl PropertyHandler for Color {
//!     fn apply_property(
//!         &self,
//!         _element: &Rc<dyn WidgetElement>,
//!         _property: &str,
//!         value: Option<&CssValue>,
//!         _pseudo: Option<&str>,
//!         _engine: &StyleEngine,
//!     ) -> Result<bool, StyleError> {
//!         *self.0.borrow_mut() = value.map(CssValue::css_text);
//!         Ok(true)
//!     }
//! }
//!
//! let color = Rc::new(Color::default());
//! let mut handlers = TypedHandlerProvider::new();
//! handlers.register("Label", "color", HandlerRef::new(color.clone()));
//!
//! let provider = |_: WidgetId, _: &StyleEngine| Some(Rc::new(Label) as Rc<dyn WidgetElement>);
//! let engine = StyleEngine::builder().element_provider(Rc::new(provider)).build();
//! engine.register_property_handler_provider(Rc::new(handlers));
//! engine.parse_style_sheet("Label { color: #336699 }").unwrap();
//!
//! engine.apply_styles(WidgetId::new(1), true);
//! assert_eq!(color.0.borrow().as_deref(), Some("#336699"));
//! ```

mod context;
mod element;
mod engine;
mod error;
mod handler;
mod provider;
mod resource;

pub use context::{Binding, ElementContext, ElementContextRegistry};
pub use element::{DefaultStyles, ElementProvider, Stylable, WidgetElement, WidgetId};
pub use engine::{StyleEngine, StyleEngineBuilder};
pub use error::{ErrorHandler, LogErrorHandler, StyleError};
pub use handler::{
    CompositePropertyHandler, HandlerCapabilities, HandlerRef, PropertyHandler,
    PropertyHandlerProvider, PropertyHandlerRegistry, TwoPhaseHandler,
};
pub use provider::{ANY_WIDGET_TYPE, TypedHandlerProvider};
pub use resource::{
    ResourceCache, ResourceConversionCache, ResourceRegistry, ValueConverter, resource_key,
};
