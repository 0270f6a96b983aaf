// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Computed-style resolution.
//!
//! A [`CascadeResolver`] turns the stylesheets in effect into one
//! [`StyleDeclaration`] per `(element, pseudo-instance)`. [`ViewCss`] ranks
//! matching rules by selector specificity, then source order (sheets in the
//! order they were added, rules in sheet order); `!important` declarations
//! win over normal ones regardless of rank.

use std::rc::Rc;

use crate::declaration::StyleDeclaration;
use crate::selector::{Element, Specificity};
use crate::stylesheet::{DocumentCss, StyleRule};

/// Produces cascaded declarations for elements.
pub trait CascadeResolver {
    /// Returns the cascaded declaration for `element` in `pseudo`, or `None`
    /// when no rule matches.
    ///
    /// The returned declaration's parent rule is the highest-ranked matching
    /// rule.
    fn computed_style(&self, element: &dyn Element, pseudo: Option<&str>)
    -> Option<StyleDeclaration>;
}

/// Reference [`CascadeResolver`] over a [`DocumentCss`].
#[derive(Clone, Debug)]
pub struct ViewCss {
    document: Rc<DocumentCss>,
}

impl ViewCss {
    /// Creates a resolver reading from `document`.
    pub fn new(document: Rc<DocumentCss>) -> Self {
        Self { document }
    }

    /// The document this resolver reads from.
    #[must_use]
    pub fn document(&self) -> &Rc<DocumentCss> {
        &self.document
    }

    /// Matching rules in ascending rank (lowest first).
    pub fn matching_rules(
        &self,
        element: &dyn Element,
        pseudo: Option<&str>,
    ) -> Vec<Rc<StyleRule>> {
        let mut matched: Vec<(Specificity, u32, Rc<StyleRule>)> = Vec::new();
        let mut order: u32 = 0;
        for sheet in self.document.style_sheets() {
            for rule in sheet.rules() {
                let this_order = order;
                order = order.saturating_add(1);
                if let Some(specificity) = rule.selectors().match_specificity(element, pseudo) {
                    matched.push((specificity, this_order, Rc::clone(rule)));
                }
            }
        }
        // Lexicographic (specificity, order); later rules win ties.
        matched.sort_by_key(|(specificity, order, _)| (*specificity, *order));
        matched.into_iter().map(|(_, _, rule)| rule).collect()
    }
}

impl CascadeResolver for ViewCss {
    fn computed_style(
        &self,
        element: &dyn Element,
        pseudo: Option<&str>,
    ) -> Option<StyleDeclaration> {
        let rules = self.matching_rules(element, pseudo);
        let winner = rules.last().cloned()?;
        let mut computed = StyleDeclaration::new();
        for rule in &rules {
            for declaration in rule.declaration() {
                computed.cascade(declaration);
            }
        }
        computed.set_parent_rule(Some(winner));
        Some(computed)
    }
}
