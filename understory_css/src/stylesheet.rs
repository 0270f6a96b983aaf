// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stylesheets and the document that owns them.
//!
//! A [`StyleSheet`] is an immutable, cheaply clonable list of [`StyleRule`]s.
//! A [`DocumentCss`] holds the sheets currently in effect, in the order they
//! were added; later sheets win ties in the cascade.

use std::cell::RefCell;
use std::rc::Rc;

use crate::declaration::StyleDeclaration;
use crate::selector::SelectorList;

/// A single rule: a selector list and the declarations it applies.
#[derive(Clone, Debug)]
pub struct StyleRule {
    selectors: SelectorList,
    declaration: StyleDeclaration,
}

impl StyleRule {
    /// Creates a rule.
    pub fn new(selectors: SelectorList, declaration: StyleDeclaration) -> Self {
        Self {
            selectors,
            declaration,
        }
    }

    /// Returns the selectors.
    #[must_use]
    pub fn selectors(&self) -> &SelectorList {
        &self.selectors
    }

    /// Returns the declaration block.
    #[must_use]
    pub fn declaration(&self) -> &StyleDeclaration {
        &self.declaration
    }
}

#[derive(Debug, Default)]
struct StyleSheetData {
    rules: Vec<Rc<StyleRule>>,
}

/// A collection of style rules.
///
/// `StyleSheet` is immutable after creation. Use [`StyleSheetBuilder`] or a
/// [`StyleSheetParser`](crate::StyleSheetParser) to construct instances.
#[derive(Clone, Debug, Default)]
pub struct StyleSheet {
    inner: Rc<StyleSheetData>,
}

impl StyleSheet {
    /// Returns the number of rules in this sheet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.rules.len()
    }

    /// Returns `true` if this sheet has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.rules.is_empty()
    }

    /// Returns an iterator over rules in source order.
    pub fn rules(&self) -> impl Iterator<Item = &Rc<StyleRule>> + '_ {
        self.inner.rules.iter()
    }
}

/// Builder for constructing [`StyleSheet`] instances.
#[derive(Debug, Default)]
pub struct StyleSheetBuilder {
    rules: Vec<Rc<StyleRule>>,
}

impl StyleSheetBuilder {
    /// Creates a new empty stylesheet builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule to the sheet.
    #[must_use]
    pub fn rule(mut self, selectors: SelectorList, declaration: StyleDeclaration) -> Self {
        self.push(StyleRule::new(selectors, declaration));
        self
    }

    /// Adds a rule in place.
    pub fn push(&mut self, rule: StyleRule) {
        self.rules.push(Rc::new(rule));
    }

    /// Finishes the sheet.
    #[must_use]
    pub fn build(self) -> StyleSheet {
        StyleSheet {
            inner: Rc::new(StyleSheetData { rules: self.rules }),
        }
    }
}

/// The set of stylesheets in effect for a widget tree.
#[derive(Debug, Default)]
pub struct DocumentCss {
    sheets: RefCell<Vec<StyleSheet>>,
}

impl DocumentCss {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sheet; it takes precedence over earlier ones on ties.
    pub fn add_style_sheet(&self, sheet: StyleSheet) {
        self.sheets.borrow_mut().push(sheet);
    }

    /// Removes every sheet.
    pub fn remove_all_style_sheets(&self) {
        self.sheets.borrow_mut().clear();
    }

    /// Snapshot of the sheets in effect, oldest first.
    #[must_use]
    pub fn style_sheets(&self) -> Vec<StyleSheet> {
        self.sheets.borrow().clone()
    }

    /// Number of sheets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sheets.borrow().len()
    }

    /// Returns `true` if no sheet is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sheets.borrow().is_empty()
    }
}
