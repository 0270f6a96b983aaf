// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style declarations: ordered property → value blocks.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::stylesheet::StyleRule;
use crate::value::CssValue;

/// Inline capacity for declaration entries before spilling to the heap.
const INLINE_CAPACITY: usize = 8;

/// A single `name: value` entry of a [`StyleDeclaration`].
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDeclaration {
    name: String,
    value: CssValue,
    important: bool,
}

impl PropertyDeclaration {
    /// Creates an entry. The property name is ASCII-lowercased.
    pub fn new(name: impl Into<String>, value: CssValue, important: bool) -> Self {
        let mut name = name.into();
        name.make_ascii_lowercase();
        Self {
            name,
            value,
            important,
        }
    }

    /// Property name, lowercased.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property value.
    #[must_use]
    pub fn value(&self) -> &CssValue {
        &self.value
    }

    /// Whether the entry was marked `!important`.
    #[must_use]
    pub fn is_important(&self) -> bool {
        self.important
    }
}

/// An ordered block of property declarations.
///
/// Entries keep their first-insertion order; setting an existing property
/// replaces its value in place. A declaration produced by a cascade carries
/// the winning [`StyleRule`] as its [parent rule](Self::parent_rule).
///
/// ```rust
/// use understory_css::{CssValue, StyleDeclaration};
///
/// let mut style = StyleDeclaration::new();
/// style.set_property("Color", CssValue::Ident("red".into()));
/// style.set_property("margin", CssValue::Number(0.0));
/// style.set_property("color", CssValue::Ident("blue".into()));
///
/// assert_eq!(style.len(), 2);
/// assert_eq!(style.css_text(), "color: blue; margin: 0");
/// ```
#[derive(Clone, Debug, Default)]
pub struct StyleDeclaration {
    entries: SmallVec<[PropertyDeclaration; INLINE_CAPACITY]>,
    parent_rule: Option<Rc<StyleRule>>,
}

impl StyleDeclaration {
    /// Creates an empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no property is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyDeclaration> + '_ {
        self.entries.iter()
    }

    /// Iterates property names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(PropertyDeclaration::name)
    }

    /// Returns the value declared for `name`, if any.
    #[must_use]
    pub fn property_value(&self, name: &str) -> Option<&CssValue> {
        self.entry(name).map(PropertyDeclaration::value)
    }

    /// Returns the full entry declared for `name`, if any.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&PropertyDeclaration> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Sets a normal-priority property.
    pub fn set_property(&mut self, name: impl Into<String>, value: CssValue) {
        self.push(PropertyDeclaration::new(name, value, false));
    }

    /// Sets a property with an explicit priority.
    pub fn set_property_with_priority(
        &mut self,
        name: impl Into<String>,
        value: CssValue,
        important: bool,
    ) {
        self.push(PropertyDeclaration::new(name, value, important));
    }

    /// Builder-style [`set_property`](Self::set_property).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: CssValue) -> Self {
        self.set_property(name, value);
        self
    }

    /// Inserts or replaces an entry, keeping the original position.
    pub fn push(&mut self, declaration: PropertyDeclaration) {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.name == declaration.name)
        {
            Some(existing) => *existing = declaration,
            None => self.entries.push(declaration),
        }
    }

    /// Removes `name`, returning its previous value.
    pub fn remove_property(&mut self, name: &str) -> Option<CssValue> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.name.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(index).value)
    }

    /// Applies `declaration` with cascade semantics: an `!important` entry
    /// already present is only replaced by another `!important` one.
    pub fn cascade(&mut self, declaration: &PropertyDeclaration) {
        if let Some(existing) = self.entry(&declaration.name)
            && existing.important
            && !declaration.important
        {
            return;
        }
        self.push(declaration.clone());
    }

    /// The rule this declaration was taken from, if any.
    #[must_use]
    pub fn parent_rule(&self) -> Option<&Rc<StyleRule>> {
        self.parent_rule.as_ref()
    }

    /// Sets or clears the parent rule.
    pub fn set_parent_rule(&mut self, rule: Option<Rc<StyleRule>>) {
        self.parent_rule = rule;
    }

    /// Serializes the declaration as `name: value; ...` text.
    #[must_use]
    pub fn css_text(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for StyleDeclaration {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Display for StyleDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", entry.name, entry.value)?;
            if entry.important {
                f.write_str(" !important")?;
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a StyleDeclaration {
    type Item = &'a PropertyDeclaration;
    type IntoIter = std::slice::Iter<'a, PropertyDeclaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
