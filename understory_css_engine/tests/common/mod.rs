// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A fake widget toolkit for exercising the engine.

#![allow(dead_code, unreachable_pub, reason = "shared between test binaries")]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use hashbrown::HashMap;
use understory_css::{CssValue, Element};
use understory_css_engine::{
    DefaultStyles, ElementProvider, PropertyHandler, Stylable, StyleEngine, StyleError,
    WidgetElement, WidgetId,
};

/// Native state of one fake widget.
#[derive(Debug, Default)]
pub struct Node {
    pub kind: &'static str,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub parent: Option<WidgetId>,
    pub children: Vec<WidgetId>,
    pub visible_children: Option<Vec<WidgetId>>,
    pub pseudo_instances: Vec<String>,
    pub inline_style: Option<String>,
    pub hovered: bool,
    /// `(property, pseudo)` → CSS text, as the toolkit would store it.
    pub native: HashMap<(String, Option<String>), String>,
    pub initialized: u32,
    pub children_styled: u32,
    pub disposed: u32,
}

/// Widget storage; a widget's id is its index.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: RefCell<Vec<Node>>,
}

impl Tree {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn add(&self, kind: &'static str, parent: Option<WidgetId>) -> WidgetId {
        let mut nodes = self.nodes.borrow_mut();
        let widget = WidgetId::new(nodes.len() as u64);
        nodes.push(Node {
            kind,
            parent,
            ..Node::default()
        });
        if let Some(parent) = parent {
            nodes[parent.get() as usize].children.push(widget);
        }
        widget
    }

    pub fn update<R>(&self, widget: WidgetId, f: impl FnOnce(&mut Node) -> R) -> R {
        f(&mut self.nodes.borrow_mut()[widget.get() as usize])
    }

    pub fn read<R>(&self, widget: WidgetId, f: impl FnOnce(&Node) -> R) -> R {
        f(&self.nodes.borrow()[widget.get() as usize])
    }

    pub fn contains(&self, widget: WidgetId) -> bool {
        (widget.get() as usize) < self.nodes.borrow().len()
    }

    pub fn native(&self, widget: WidgetId, property: &str, pseudo: Option<&str>) -> Option<String> {
        self.read(widget, |node| {
            node.native
                .get(&(property.to_owned(), pseudo.map(str::to_owned)))
                .cloned()
        })
    }

    pub fn set_native(&self, widget: WidgetId, property: &str, pseudo: Option<&str>, value: &str) {
        self.update(widget, |node| {
            node.native.insert(
                (property.to_owned(), pseudo.map(str::to_owned)),
                value.to_owned(),
            );
        });
    }

    /// What the user sees: the hover value while hovered, else the base one.
    pub fn observed(&self, widget: WidgetId, property: &str) -> Option<String> {
        let hovered = self.read(widget, |node| node.hovered);
        hovered
            .then(|| self.native(widget, property, Some("hover")))
            .flatten()
            .or_else(|| self.native(widget, property, None))
    }

    pub fn element(self: &Rc<Self>, widget: WidgetId) -> Option<Rc<TestElement>> {
        if !self.contains(widget) {
            return None;
        }
        let (kind, id, pseudo_instances) = self.read(widget, |node| {
            (node.kind, node.id.clone(), node.pseudo_instances.clone())
        });
        Some(Rc::new(TestElement {
            tree: self.clone(),
            widget,
            kind,
            id,
            pseudo_instances,
            defaults: DefaultStyles::new(),
        }))
    }
}

/// Adapter the engine sees for a fake widget.
#[derive(Debug)]
pub struct TestElement {
    tree: Rc<Tree>,
    widget: WidgetId,
    kind: &'static str,
    id: Option<String>,
    pseudo_instances: Vec<String>,
    defaults: DefaultStyles,
}

impl Element for TestElement {
    fn local_name(&self) -> &str {
        self.kind
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn has_class(&self, class: &str) -> bool {
        self.tree
            .read(self.widget, |node| node.classes.iter().any(|c| c == class))
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.tree.read(self.widget, |node| {
            node.attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        })
    }

    fn is_pseudo_instance_of(&self, pseudo: &str) -> bool {
        pseudo == "hover" && self.tree.read(self.widget, |node| node.hovered)
    }

    fn parent_element(&self) -> Option<Rc<dyn Element>> {
        let parent = self.parent_widget()?;
        self.tree
            .element(parent)
            .map(|element| element as Rc<dyn Element>)
    }
}

impl WidgetElement for TestElement {
    fn widget(&self) -> WidgetId {
        self.widget
    }

    fn parent_widget(&self) -> Option<WidgetId> {
        self.tree.read(self.widget, |node| node.parent)
    }

    fn children(&self) -> Vec<WidgetId> {
        self.tree.read(self.widget, |node| node.children.clone())
    }

    fn visible_children(&self) -> Option<Vec<WidgetId>> {
        self.tree
            .read(self.widget, |node| node.visible_children.clone())
    }

    fn stylable(&self) -> Option<&dyn Stylable> {
        Some(self)
    }
}

impl Stylable for TestElement {
    fn default_styles(&self) -> &DefaultStyles {
        &self.defaults
    }

    fn static_pseudo_instances(&self) -> &[String] {
        &self.pseudo_instances
    }

    fn inline_style(&self) -> Option<String> {
        self.tree
            .read(self.widget, |node| node.inline_style.clone())
    }

    fn initialize(&self) {
        self.tree.update(self.widget, |node| node.initialized += 1);
    }

    fn on_children_styled(&self, _children: &[WidgetId]) {
        self.tree
            .update(self.widget, |node| node.children_styled += 1);
    }

    fn dispose(&self) {
        self.tree.update(self.widget, |node| node.disposed += 1);
    }
}

/// [`ElementProvider`] over a [`Tree`] that records hooked widgets.
#[derive(Debug)]
pub struct TreeProvider {
    pub tree: Rc<Tree>,
    pub hooked: RefCell<Vec<WidgetId>>,
}

impl TreeProvider {
    pub fn new(tree: &Rc<Tree>) -> Rc<Self> {
        Rc::new(Self {
            tree: tree.clone(),
            hooked: RefCell::new(Vec::new()),
        })
    }
}

impl ElementProvider for TreeProvider {
    fn element(&self, widget: WidgetId, _engine: &StyleEngine) -> Option<Rc<dyn WidgetElement>> {
        self.tree
            .element(widget)
            .map(|element| element as Rc<dyn WidgetElement>)
    }

    fn hook_widget(&self, widget: WidgetId) {
        self.hooked.borrow_mut().push(widget);
    }
}

/// One recorded handler invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub widget: WidgetId,
    pub property: String,
    pub pseudo: Option<String>,
    pub value: Option<String>,
}

/// Stores values as native state and records every application.
#[derive(Debug)]
pub struct NativeHandler {
    tree: Rc<Tree>,
    pub calls: RefCell<Vec<Call>>,
}

impl NativeHandler {
    pub fn new(tree: &Rc<Tree>) -> Rc<Self> {
        Rc::new(Self {
            tree: tree.clone(),
            calls: RefCell::new(Vec::new()),
        })
    }

    /// `(pseudo, value)` pairs applied for `property`, in order.
    pub fn applied(&self, property: &str) -> Vec<(Option<String>, Option<String>)> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.property == property)
            .map(|call| (call.pseudo.clone(), call.value.clone()))
            .collect()
    }

    pub fn count(&self, property: &str) -> usize {
        self.applied(property).len()
    }
}

impl PropertyHandler for NativeHandler {
    fn apply_property(
        &self,
        element: &Rc<dyn WidgetElement>,
        property: &str,
        value: Option<&CssValue>,
        pseudo: Option<&str>,
        _engine: &StyleEngine,
    ) -> Result<bool, StyleError> {
        let widget = element.widget();
        let value = value.map(CssValue::css_text);
        self.calls.borrow_mut().push(Call {
            widget,
            property: property.to_owned(),
            pseudo: pseudo.map(str::to_owned),
            value: value.clone(),
        });
        self.tree.update(widget, |node| {
            let key = (property.to_owned(), pseudo.map(str::to_owned));
            match value {
                Some(value) => node.native.insert(key, value),
                None => node.native.remove(&key),
            }
        });
        Ok(true)
    }

    fn retrieve_property(
        &self,
        element: &Rc<dyn WidgetElement>,
        property: &str,
        pseudo: Option<&str>,
        _engine: &StyleEngine,
    ) -> Result<Option<String>, StyleError> {
        Ok(self.tree.native(element.widget(), property, pseudo))
    }
}

/// Counts reported errors.
#[derive(Debug, Default)]
pub struct ErrorLog {
    pub messages: RefCell<Vec<String>>,
    pub count: Cell<usize>,
}

impl understory_css_engine::ErrorHandler for ErrorLog {
    fn error(&self, error: &StyleError) {
        self.count.set(self.count.get() + 1);
        self.messages.borrow_mut().push(error.to_string());
    }
}
