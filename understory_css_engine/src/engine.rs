// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The style-application engine.

use core::any::{Any, TypeId};
use core::cell::{Cell, RefCell};
use core::fmt;
use std::io::Read;
use std::rc::Rc;

use hashbrown::HashSet;
use smallvec::SmallVec;
use understory_css::{
    CascadeResolver, CssParser, CssValue, DocumentCss, Selector, SelectorList, StyleDeclaration,
    StyleSheet, StyleSheetParser, ViewCss,
};

use crate::context::{Binding, ElementContext, ElementContextRegistry};
use crate::element::{ElementProvider, WidgetElement, WidgetId};
use crate::error::{ErrorHandler, LogErrorHandler, StyleError};
use crate::handler::{
    HandlerCapabilities, HandlerRef, PropertyHandlerProvider, PropertyHandlerRegistry,
    TwoPhaseHandler,
};
use crate::resource::{ResourceCache, ResourceConversionCache, ResourceRegistry, ValueConverter};

/// Property names claimed during one outer declaration application.
type AppliedProperties = RefCell<Option<HashSet<String>>>;

/// Applies cascaded CSS to a widget tree.
///
/// The engine is single-threaded and re-entrant: every handler, provider and
/// converter callback receives `&StyleEngine` and may call back into it.
///
/// Construct one with [`StyleEngine::builder`].
pub struct StyleEngine {
    document: Rc<DocumentCss>,
    parser: Box<dyn StyleSheetParser>,
    cascade: Box<dyn CascadeResolver>,
    element_provider: RefCell<Option<Rc<dyn ElementProvider>>>,
    contexts: RefCell<ElementContextRegistry>,
    handlers: PropertyHandlerRegistry,
    resources: ResourceConversionCache,
    error_handler: RefCell<Option<Rc<dyn ErrorHandler>>>,
    applied: AppliedProperties,
    strict: Cell<bool>,
    compute_default_style: Cell<bool>,
}

/// Builder for [`StyleEngine`].
///
/// Every option has a default: the [`CssParser`], a [`ViewCss`] over the
/// engine's own [`DocumentCss`], a [`LogErrorHandler`], a fresh
/// [`ResourceCache`], no element provider, non-strict, and no default-style
/// computation.
#[derive(Default)]
pub struct StyleEngineBuilder {
    document: Option<Rc<DocumentCss>>,
    parser: Option<Box<dyn StyleSheetParser>>,
    cascade: Option<Box<dyn CascadeResolver>>,
    element_provider: Option<Rc<dyn ElementProvider>>,
    error_handler: Option<Option<Rc<dyn ErrorHandler>>>,
    resource_registry: Option<Option<Rc<dyn ResourceRegistry>>>,
    strict: bool,
    compute_default_style: bool,
}

impl StyleEngineBuilder {
    /// Creates a builder with every option at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Document that parsed stylesheets are added to.
    #[must_use]
    pub fn document(mut self, document: Rc<DocumentCss>) -> Self {
        self.document = Some(document);
        self
    }

    /// Parser used by the `parse_*` and `read_*` operations.
    #[must_use]
    pub fn parser(mut self, parser: impl StyleSheetParser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Resolver for computed styles.
    #[must_use]
    pub fn cascade(mut self, cascade: impl CascadeResolver + 'static) -> Self {
        self.cascade = Some(Box::new(cascade));
        self
    }

    /// Provider mapping widgets to elements.
    #[must_use]
    pub fn element_provider(mut self, provider: Rc<dyn ElementProvider>) -> Self {
        self.element_provider = Some(provider);
        self
    }

    /// Sink for non-fatal failures; `None` discards them.
    #[must_use]
    pub fn error_handler(mut self, handler: Option<Rc<dyn ErrorHandler>>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Registry converted resources are memoized in; `None` disables
    /// memoization.
    #[must_use]
    pub fn resource_registry(mut self, registry: Option<Rc<dyn ResourceRegistry>>) -> Self {
        self.resource_registry = Some(registry);
        self
    }

    /// Report unsupported properties to the error handler instead of
    /// ignoring them.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Snapshot and re-apply default styles in [`StyleEngine::apply_styles`].
    #[must_use]
    pub fn compute_default_style(mut self, compute: bool) -> Self {
        self.compute_default_style = compute;
        self
    }

    /// Builds the engine.
    #[must_use]
    pub fn build(self) -> StyleEngine {
        let document = self.document.unwrap_or_default();
        let parser: Box<dyn StyleSheetParser> = match self.parser {
            Some(parser) => parser,
            None => Box::new(CssParser),
        };
        let cascade: Box<dyn CascadeResolver> = match self.cascade {
            Some(cascade) => cascade,
            None => Box::new(ViewCss::new(document.clone())),
        };
        let error_handler: Option<Rc<dyn ErrorHandler>> = match self.error_handler {
            Some(handler) => handler,
            None => Some(Rc::new(LogErrorHandler)),
        };
        let registry: Option<Rc<dyn ResourceRegistry>> = match self.resource_registry {
            Some(registry) => registry,
            None => Some(Rc::new(ResourceCache::new())),
        };
        StyleEngine {
            document,
            parser,
            cascade,
            element_provider: RefCell::new(self.element_provider),
            contexts: RefCell::new(ElementContextRegistry::new()),
            handlers: PropertyHandlerRegistry::new(),
            resources: ResourceConversionCache::new(registry),
            error_handler: RefCell::new(error_handler),
            applied: RefCell::new(None),
            strict: Cell::new(self.strict),
            compute_default_style: Cell::new(self.compute_default_style),
        }
    }
}

impl fmt::Debug for StyleEngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleEngineBuilder")
            .field("strict", &self.strict)
            .field("compute_default_style", &self.compute_default_style)
            .finish_non_exhaustive()
    }
}

/// Tracks the properties claimed during one outer declaration application.
///
/// Only the scope that installed the set removes it.
struct AvoidanceScope<'a> {
    slot: &'a AppliedProperties,
    owner: bool,
}

impl<'a> AvoidanceScope<'a> {
    fn enter(slot: &'a AppliedProperties) -> Self {
        let mut applied = slot.borrow_mut();
        let owner = applied.is_none();
        if owner {
            *applied = Some(HashSet::new());
        }
        Self { slot, owner }
    }
}

impl Drop for AvoidanceScope<'_> {
    fn drop(&mut self) {
        if self.owner {
            *self.slot.borrow_mut() = None;
        }
    }
}

impl Default for StyleEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl StyleEngine {
    /// Starts building an engine.
    #[must_use]
    pub fn builder() -> StyleEngineBuilder {
        StyleEngineBuilder::new()
    }

    // -------------------------------------------------------------------------
    // Stylesheets
    // -------------------------------------------------------------------------

    /// The document parsed stylesheets are added to.
    #[must_use]
    pub fn document(&self) -> &Rc<DocumentCss> {
        &self.document
    }

    /// Parses `text` and adds the sheet to the document.
    pub fn parse_style_sheet(&self, text: &str) -> Result<StyleSheet, StyleError> {
        let sheet = self.parser.parse_style_sheet(text)?;
        log::debug!("loaded style sheet with {} rules", sheet.len());
        self.document.add_style_sheet(sheet.clone());
        Ok(sheet)
    }

    /// Reads a stylesheet from `reader` and adds it to the document.
    pub fn read_style_sheet(&self, reader: impl Read) -> Result<StyleSheet, StyleError> {
        self.parse_style_sheet(&read_source(reader)?)
    }

    /// Parses a declaration block body.
    pub fn parse_style_declaration(&self, text: &str) -> Result<StyleDeclaration, StyleError> {
        Ok(self.parser.parse_style_declaration(text)?)
    }

    /// Reads a declaration block body from `reader`.
    pub fn read_style_declaration(
        &self,
        reader: impl Read,
    ) -> Result<StyleDeclaration, StyleError> {
        self.parse_style_declaration(&read_source(reader)?)
    }

    /// Parses a selector list.
    pub fn parse_selectors(&self, text: &str) -> Result<SelectorList, StyleError> {
        Ok(self.parser.parse_selectors(text)?)
    }

    /// Reads a selector list from `reader`.
    pub fn read_selectors(&self, reader: impl Read) -> Result<SelectorList, StyleError> {
        self.parse_selectors(&read_source(reader)?)
    }

    /// Parses a single property value.
    pub fn parse_property_value(&self, text: &str) -> Result<CssValue, StyleError> {
        Ok(self.parser.parse_property_value(text)?)
    }

    /// Reads a single property value from `reader`.
    pub fn read_property_value(&self, reader: impl Read) -> Result<CssValue, StyleError> {
        self.parse_property_value(&read_source(reader)?)
    }

    /// Parses `text` as a declaration block and applies it to `widget`.
    ///
    /// The text is parsed before anything is applied; a parse failure
    /// changes nothing.
    pub fn parse_and_apply_style_declaration(
        &self,
        widget: WidgetId,
        text: &str,
    ) -> Result<StyleDeclaration, StyleError> {
        let declaration = self.parse_style_declaration(text)?;
        self.apply_style_declaration(widget, &declaration, None);
        Ok(declaration)
    }

    // -------------------------------------------------------------------------
    // Styling passes
    // -------------------------------------------------------------------------

    /// Styles `widget` (and its subtree when `recurse`), computing default
    /// styles when the engine is configured to.
    pub fn apply_styles(&self, widget: WidgetId, recurse: bool) {
        self.apply_styles_with(widget, recurse, self.compute_default_style.get());
    }

    /// Styles `widget` (and its subtree when `recurse`).
    ///
    /// With `compute_defaults`, default-style snapshots are taken and
    /// re-applied before the cascaded styles. Unknown widgets are ignored.
    pub fn apply_styles_with(&self, widget: WidgetId, recurse: bool, compute_defaults: bool) {
        if let Some(element) = self.element(widget) {
            self.style_element(&element, recurse, compute_defaults);
        }
    }

    fn style_element(&self, element: &Rc<dyn WidgetElement>, recurse: bool, compute_defaults: bool) {
        if self.is_hidden(element) {
            log::trace!("skipping hidden {}", element.widget());
            return;
        }
        log::debug!("styling {} ({})", element.widget(), element.local_name());

        let style = self.cascade.computed_style(&**element, None);
        if compute_defaults {
            self.apply_default_style_to(element, false, style.as_ref(), None);
        }

        if let Some(stylable) = element.stylable() {
            let pseudos = stylable.static_pseudo_instances().to_vec();
            for pseudo in &pseudos {
                let pseudo = Some(pseudo.as_str());
                let pseudo_style = self.cascade.computed_style(&**element, pseudo);
                if compute_defaults {
                    self.apply_default_style_to(element, false, pseudo_style.as_ref(), pseudo);
                }
                if let Some(pseudo_style) = pseudo_style
                    && applies_to_pseudo_instance(&pseudo_style, pseudo)
                {
                    self.apply_to_element(element, &pseudo_style, pseudo);
                }
            }
        }

        if let Some(style) = &style {
            self.apply_to_element(element, style, None);
        }

        if let Err(error) = self.apply_inline_style_to(element, false) {
            self.handle_error(&error);
        }

        if recurse {
            let children = element
                .visible_children()
                .unwrap_or_else(|| element.children());
            for child in &children {
                if let Some(child) = self.element(*child) {
                    self.style_element(&child, true, compute_defaults);
                }
            }
            if let Some(stylable) = element.stylable() {
                stylable.on_children_styled(&children);
            }
        }
    }

    /// Returns `true` if the parent exposes visible children and `element`
    /// is not among them.
    fn is_hidden(&self, element: &Rc<dyn WidgetElement>) -> bool {
        let Some(parent) = element
            .parent_widget()
            .and_then(|parent| self.element(parent))
        else {
            return false;
        };
        parent
            .visible_children()
            .is_some_and(|visible| !visible.contains(&element.widget()))
    }

    /// Applies `declaration` to `widget` for `pseudo`.
    ///
    /// Each property is dispatched at most once per outer call, including
    /// nested calls made by handlers. Two-phase handlers are notified once
    /// after the block.
    pub fn apply_style_declaration(
        &self,
        widget: WidgetId,
        declaration: &StyleDeclaration,
        pseudo: Option<&str>,
    ) {
        if let Some(element) = self.element(widget) {
            self.apply_to_element(&element, declaration, pseudo);
        }
    }

    fn apply_to_element(
        &self,
        element: &Rc<dyn WidgetElement>,
        declaration: &StyleDeclaration,
        pseudo: Option<&str>,
    ) {
        let _scope = AvoidanceScope::enter(&self.applied);
        let mut finishers: SmallVec<[Rc<dyn TwoPhaseHandler>; 2]> = SmallVec::new();
        for entry in declaration {
            let Some(handler) = self.dispatch(element, entry.name(), Some(entry.value()), pseudo)
            else {
                continue;
            };
            if handler
                .capabilities()
                .intersects(HandlerCapabilities::TWO_PHASE | HandlerCapabilities::DELEGATE)
                && let Some(finisher) = handler.two_phase_facet()
                && !finishers.iter().any(|known| Rc::ptr_eq(known, finisher))
            {
                finishers.push(finisher.clone());
            }
        }
        for finisher in &finishers {
            if let Err(error) = finisher.on_all_properties_applied(element, self) {
                self.handle_error(&error);
            }
        }
    }

    /// Applies a single property to `widget`, returning the handler that
    /// claimed it.
    pub fn apply_css_property(
        &self,
        widget: WidgetId,
        property: &str,
        value: Option<&CssValue>,
        pseudo: Option<&str>,
    ) -> Option<HandlerRef> {
        let element = self.element(widget)?;
        self.dispatch(&element, property, value, pseudo)
    }

    fn dispatch(
        &self,
        element: &Rc<dyn WidgetElement>,
        property: &str,
        value: Option<&CssValue>,
        pseudo: Option<&str>,
    ) -> Option<HandlerRef> {
        if self
            .applied
            .borrow()
            .as_ref()
            .is_some_and(|applied| applied.contains(property))
        {
            log::trace!("{property} already applied to {}", element.widget());
            return None;
        }
        let inherited;
        let value = match value {
            Some(value) if value.is_inherit() => {
                inherited = self.inherited_value(element, property, pseudo);
                inherited.as_ref()
            }
            other => other,
        };
        for handler in self.handlers.handlers_for(&**element, property) {
            match handler
                .handler()
                .apply_property(element, property, value, pseudo, self)
            {
                Ok(true) => {
                    log::trace!("applied {property} to {}", element.widget());
                    if let Some(applied) = self.applied.borrow_mut().as_mut() {
                        applied.insert(property.to_owned());
                    }
                    return Some(handler);
                }
                Ok(false) => {}
                Err(error) => {
                    if self.strict.get() || !error.is_unsupported() {
                        self.handle_error(&error);
                    }
                }
            }
        }
        None
    }

    /// The parent's current value of `property`, re-parsed.
    fn inherited_value(
        &self,
        element: &Rc<dyn WidgetElement>,
        property: &str,
        pseudo: Option<&str>,
    ) -> Option<CssValue> {
        let parent = element.parent_widget()?;
        let text = self.retrieve_css_property(parent, property, pseudo)?;
        match self.parser.parse_property_value(&text) {
            Ok(value) => Some(value),
            Err(error) => {
                self.handle_error(&error.into());
                None
            }
        }
    }

    /// Reads the current native value of `property` on `widget` as CSS text.
    ///
    /// Returns the first non-empty answer from the candidate handlers. A
    /// failing handler is reported and ends the lookup with `None`.
    pub fn retrieve_css_property(
        &self,
        widget: WidgetId,
        property: &str,
        pseudo: Option<&str>,
    ) -> Option<String> {
        let element = self.element(widget)?;
        for handler in self.handlers.handlers_for(&*element, property) {
            match handler
                .handler()
                .retrieve_property(&element, property, pseudo, self)
            {
                Ok(Some(value)) if !value.is_empty() => return Some(value),
                Ok(_) => {}
                Err(error) => {
                    self.handle_error(&error);
                    return None;
                }
            }
        }
        None
    }

    /// Parses and applies the inline style of `widget` (and its subtree
    /// when `recurse`).
    pub fn apply_inline_style(&self, widget: WidgetId, recurse: bool) -> Result<(), StyleError> {
        match self.element(widget) {
            Some(element) => self.apply_inline_style_to(&element, recurse),
            None => Ok(()),
        }
    }

    fn apply_inline_style_to(
        &self,
        element: &Rc<dyn WidgetElement>,
        recurse: bool,
    ) -> Result<(), StyleError> {
        if let Some(text) = element.stylable().and_then(|stylable| stylable.inline_style())
            && !text.trim().is_empty()
        {
            let declaration = self.parser.parse_style_declaration(&text)?;
            self.apply_to_element(element, &declaration, None);
        }
        if recurse {
            for child in element.children() {
                if let Some(child) = self.element(child) {
                    self.apply_inline_style_to(&child, true)?;
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Default styles
    // -------------------------------------------------------------------------

    /// Computes the default-style snapshot of `widget` for `pseudo`.
    #[must_use]
    pub fn default_style_declaration(
        &self,
        widget: WidgetId,
        pseudo: Option<&str>,
    ) -> Option<StyleDeclaration> {
        let element = self.element(widget)?;
        self.handlers
            .compute_default_style_declaration(self, &element, None, pseudo)
    }

    /// Re-applies the default-style snapshot of `widget` (and its subtree
    /// when `recurse`).
    ///
    /// Elements without a previous snapshot are left alone.
    pub fn apply_default_style_declaration(&self, widget: WidgetId, recurse: bool) {
        if let Some(element) = self.element(widget) {
            self.apply_default_style_to(&element, recurse, None, None);
        }
    }

    fn apply_default_style_to(
        &self,
        element: &Rc<dyn WidgetElement>,
        recurse: bool,
        proposed: Option<&StyleDeclaration>,
        pseudo: Option<&str>,
    ) {
        if let Some(stylable) = element.stylable() {
            let had_snapshot = stylable.default_style(pseudo).is_some();
            let defaults = self
                .handlers
                .compute_default_style_declaration(self, element, proposed, pseudo);
            if had_snapshot && let Some(defaults) = defaults {
                let was_strict = self.strict.replace(false);
                self.apply_to_element(element, &defaults, pseudo);
                self.strict.set(was_strict);
            }
        }
        if recurse {
            let children = element.children();
            for child in &children {
                if let Some(child) = self.element(*child) {
                    self.apply_default_style_to(&child, true, None, None);
                }
            }
            if let Some(stylable) = element.stylable() {
                stylable.on_children_styled(&children);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Sorted names of the properties supported on `widget`.
    #[must_use]
    pub fn css_properties(&self, widget: WidgetId, include_deprecated: bool) -> Vec<String> {
        self.element(widget)
            .map(|element| self.handlers.properties(&*element, include_deprecated))
            .unwrap_or_default()
    }

    /// Longhands of the shorthand `property`, or `None` if no handler
    /// expands it.
    #[must_use]
    pub fn css_composite_property_names(&self, property: &str) -> Option<Vec<String>> {
        self.handlers.composite_property_names(property)
    }

    /// Returns `true` if `selector` matches `widget` in `pseudo`.
    #[must_use]
    pub fn matches(&self, selector: &Selector, widget: WidgetId, pseudo: Option<&str>) -> bool {
        self.element(widget)
            .is_some_and(|element| selector.matches(&*element, pseudo))
    }

    // -------------------------------------------------------------------------
    // Handlers and converters
    // -------------------------------------------------------------------------

    /// Appends a handler provider; earlier providers win.
    pub fn register_property_handler_provider(&self, provider: Rc<dyn PropertyHandlerProvider>) {
        self.handlers.register(provider);
    }

    /// Removes a handler provider.
    pub fn unregister_property_handler_provider(
        &self,
        provider: &Rc<dyn PropertyHandlerProvider>,
    ) -> bool {
        self.handlers.unregister(provider)
    }

    /// The handler providers, in order.
    #[must_use]
    pub fn property_handler_providers(&self) -> Vec<Rc<dyn PropertyHandlerProvider>> {
        self.handlers.providers()
    }

    /// Registers a converter for its target type; the last registration wins.
    pub fn register_value_converter(&self, converter: Rc<dyn ValueConverter>) {
        self.resources.register_converter(converter);
    }

    /// Removes the converter for `target`.
    pub fn unregister_value_converter(&self, target: TypeId) -> Option<Rc<dyn ValueConverter>> {
        self.resources.unregister_converter(target)
    }

    /// The converter for `target`.
    #[must_use]
    pub fn value_converter(&self, target: TypeId) -> Option<Rc<dyn ValueConverter>> {
        self.resources.converter(target)
    }

    /// Converts `value` into a resource of type `target`, memoized in the
    /// resource registry.
    pub fn convert(
        &self,
        value: &CssValue,
        target: TypeId,
        context: Option<&dyn Any>,
    ) -> Result<Option<Rc<dyn Any>>, StyleError> {
        self.resources.convert(value, target, self, context)
    }

    /// Typed [`convert`](Self::convert).
    pub fn convert_to<T: Any>(
        &self,
        value: &CssValue,
        context: Option<&dyn Any>,
    ) -> Result<Option<Rc<T>>, StyleError> {
        match self.convert(value, TypeId::of::<T>(), context)? {
            Some(resource) => resource
                .downcast::<T>()
                .map(Some)
                .map_err(|_| StyleError::conversion::<T>("converter produced another type")),
            None => Ok(None),
        }
    }

    /// Serializes `resource` of type `target` back to CSS text.
    pub fn convert_to_css_text(
        &self,
        resource: &dyn Any,
        target: TypeId,
        context: Option<&dyn Any>,
    ) -> Result<Option<String>, StyleError> {
        self.resources.to_css_text(resource, target, self, context)
    }

    /// The registry converted resources are memoized in.
    #[must_use]
    pub fn resource_registry(&self) -> Option<&Rc<dyn ResourceRegistry>> {
        self.resources.registry()
    }

    // -------------------------------------------------------------------------
    // Elements
    // -------------------------------------------------------------------------

    /// The active element provider.
    #[must_use]
    pub fn element_provider(&self) -> Option<Rc<dyn ElementProvider>> {
        self.element_provider.borrow().clone()
    }

    /// Replaces the element provider; existing contexts are refreshed on
    /// their next lookup.
    pub fn set_element_provider(&self, provider: Option<Rc<dyn ElementProvider>>) {
        *self.element_provider.borrow_mut() = provider;
    }

    /// The element for `widget`, creating or refreshing its context.
    ///
    /// Returns `None` when no provider is set or the provider cannot adapt
    /// the widget.
    pub fn element(&self, widget: WidgetId) -> Option<Rc<dyn WidgetElement>> {
        let provider = self.element_provider();
        let cached = self
            .contexts
            .borrow()
            .get(widget)
            .filter(|context| !context.must_be_refreshed(provider.as_ref()))
            .map(|context| context.element().clone());
        if cached.is_some() {
            return cached;
        }
        let provider = provider?;
        let element = provider.element(widget, self)?;
        let binding = self
            .contexts
            .borrow_mut()
            .bind(widget, element.clone(), Some(provider.clone()));
        match &binding {
            Binding::Created => {
                log::debug!("created element context for {widget}");
                provider.hook_widget(widget);
            }
            Binding::Refreshed(_) => {
                log::debug!("refreshed element context for {widget}");
                binding.carry_default_styles(&element);
            }
        }
        if let Some(stylable) = element.stylable() {
            stylable.initialize();
        }
        Some(element)
    }

    /// A copy of the context of `widget`, without creating one.
    #[must_use]
    pub fn element_context(&self, widget: WidgetId) -> Option<ElementContext> {
        self.contexts.borrow().get(widget).cloned()
    }

    /// Stores opaque data on the context of `widget`.
    ///
    /// Returns `false` if the widget has no context.
    pub fn set_element_data(&self, widget: WidgetId, key: &str, value: Rc<dyn Any>) -> bool {
        match self.contexts.borrow_mut().get_mut(widget) {
            Some(context) => {
                context.set_data(key, value);
                true
            }
            None => false,
        }
    }

    /// Opaque data stored on the context of `widget`.
    #[must_use]
    pub fn element_data(&self, widget: WidgetId, key: &str) -> Option<Rc<dyn Any>> {
        self.contexts
            .borrow()
            .get(widget)
            .and_then(|context| context.data(key).cloned())
    }

    /// Number of live element contexts.
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.contexts.borrow().len()
    }

    /// Forgets the context of a widget the host destroyed.
    pub fn handle_widget_disposed(&self, widget: WidgetId) {
        if self.contexts.borrow_mut().remove(widget).is_some() {
            log::debug!("removed element context for {widget}");
        }
    }

    // -------------------------------------------------------------------------
    // Errors and configuration
    // -------------------------------------------------------------------------

    /// Routes `error` to the error handler, if any.
    pub fn handle_error(&self, error: &StyleError) {
        let handler = self.error_handler.borrow().clone();
        if let Some(handler) = handler {
            handler.error(error);
        }
    }

    /// The error handler.
    #[must_use]
    pub fn error_handler(&self) -> Option<Rc<dyn ErrorHandler>> {
        self.error_handler.borrow().clone()
    }

    /// Replaces the error handler; `None` discards failures.
    pub fn set_error_handler(&self, handler: Option<Rc<dyn ErrorHandler>>) {
        *self.error_handler.borrow_mut() = handler;
    }

    /// Whether unsupported properties are reported.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict.get()
    }

    /// Sets strict mode.
    pub fn set_strict(&self, strict: bool) {
        self.strict.set(strict);
    }

    /// Whether [`apply_styles`](Self::apply_styles) computes default styles.
    #[must_use]
    pub fn computes_default_style(&self) -> bool {
        self.compute_default_style.get()
    }

    /// Sets whether [`apply_styles`](Self::apply_styles) computes default
    /// styles.
    pub fn set_compute_default_style(&self, compute: bool) {
        self.compute_default_style.set(compute);
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Removes every stylesheet.
    pub fn reset(&self) {
        self.document.remove_all_style_sheets();
    }

    /// Resets the engine, notifies each stylable element once, forgets every
    /// context and releases cached resources.
    ///
    /// Must not be called from inside a styling pass.
    pub fn dispose(&self) {
        self.reset();
        let contexts = self.contexts.borrow_mut().drain();
        log::debug!("disposing {} element contexts", contexts.len());
        for context in &contexts {
            context.dispose();
        }
        self.resources.dispose();
    }
}

impl fmt::Debug for StyleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleEngine")
            .field("style_sheets", &self.document.len())
            .field("contexts", &self.contexts.borrow().len())
            .field("providers", &self.handlers.len())
            .field("resources", &self.resources)
            .field("strict", &self.strict.get())
            .field("compute_default_style", &self.compute_default_style.get())
            .finish_non_exhaustive()
    }
}

fn read_source(mut reader: impl Read) -> Result<String, StyleError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

/// Whether a pseudo-instance style should be applied.
///
/// When the winning rule guards on attribute or pseudo-class literals, one
/// of them must name `pseudo`; otherwise the style applies unconditionally.
fn applies_to_pseudo_instance(style: &StyleDeclaration, pseudo: Option<&str>) -> bool {
    let Some(rule) = style.parent_rule() else {
        return true;
    };
    let mut guarded = false;
    for selector in rule.selectors().iter() {
        for literal in selector.conditions().into_iter().filter_map(|c| c.guard_literal()) {
            if Some(literal) == pseudo {
                return true;
            }
            guarded = true;
        }
    }
    !guarded
}
