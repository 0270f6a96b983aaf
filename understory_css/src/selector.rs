// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selectors, conditions, specificity and matching.
//!
//! Selectors are matched against anything implementing [`Element`]. A match
//! is always evaluated for a particular *pseudo-instance* (`None` for the
//! base style): pseudo-class conditions and `[attr="literal"]` guards hold
//! when the literal names the pseudo-instance being computed, so a rule like
//! `Button[state="hover"]` contributes to the `hover` computed style even
//! when the native widget does not expose a `state` attribute.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

/// Selector-matching view of a node.
///
/// Only [`local_name`](Self::local_name) and
/// [`parent_element`](Self::parent_element) are required; the remaining
/// accessors default to "absent".
pub trait Element {
    /// Element (type) name matched by type selectors.
    fn local_name(&self) -> &str;

    /// Identifier matched by `#id`.
    fn id(&self) -> Option<&str> {
        None
    }

    /// Returns `true` if the element carries `class`.
    fn has_class(&self, _class: &str) -> bool {
        false
    }

    /// Attribute value for `[name]` conditions.
    fn attribute(&self, _name: &str) -> Option<String> {
        None
    }

    /// Returns `true` if the element is currently in the dynamic state
    /// `pseudo` (for example `focus`).
    fn is_pseudo_instance_of(&self, _pseudo: &str) -> bool {
        false
    }

    /// Parent element, used by combinators.
    fn parent_element(&self) -> Option<Rc<dyn Element>>;
}

/// Selector specificity ordered as `(ids, classes/attributes/pseudo-classes,
/// types)`; compared lexicographically.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl Specificity {
    fn saturating_add(self, other: Self) -> Self {
        Self(
            self.0.saturating_add(other.0),
            self.1.saturating_add(other.1),
            self.2.saturating_add(other.2),
        )
    }
}

/// Attribute condition operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttributeOperator {
    /// `[name]`
    Exists,
    /// `[name=value]`
    Equals,
    /// `[name~=value]`
    Includes,
    /// `[name|=value]`
    DashMatch,
    /// `[name^=value]`
    Prefix,
    /// `[name$=value]`
    Suffix,
    /// `[name*=value]`
    Substring,
}

impl AttributeOperator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Exists => "",
            Self::Equals => "=",
            Self::Includes => "~=",
            Self::DashMatch => "|=",
            Self::Prefix => "^=",
            Self::Suffix => "$=",
            Self::Substring => "*=",
        }
    }

    fn matches(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Exists => true,
            Self::Equals => actual == expected,
            Self::Includes => actual.split_ascii_whitespace().any(|word| word == expected),
            Self::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            Self::Prefix => !expected.is_empty() && actual.starts_with(expected),
            Self::Suffix => !expected.is_empty() && actual.ends_with(expected),
            Self::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

/// A condition attached to a simple selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    /// `#id`
    Id(String),
    /// `.class`
    Class(String),
    /// `:name`
    PseudoClass(String),
    /// `[name op value]`
    Attribute {
        /// Attribute name.
        name: String,
        /// Comparison operator.
        operator: AttributeOperator,
        /// Literal compared against; `None` only for [`AttributeOperator::Exists`].
        value: Option<String>,
    },
    /// Both conditions hold.
    And(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Returns `true` if the condition holds for `element` in `pseudo`.
    pub fn matches(&self, element: &dyn Element, pseudo: Option<&str>) -> bool {
        match self {
            Self::Id(id) => element.id() == Some(id.as_str()),
            Self::Class(class) => element.has_class(class),
            Self::PseudoClass(name) => {
                pseudo == Some(name.as_str()) || element.is_pseudo_instance_of(name)
            }
            Self::Attribute {
                name,
                operator,
                value,
            } => {
                let expected = value.as_deref().unwrap_or_default();
                if *operator == AttributeOperator::Equals && pseudo == Some(expected) {
                    return true;
                }
                element
                    .attribute(name)
                    .is_some_and(|actual| operator.matches(&actual, expected))
            }
            Self::And(first, second) => {
                first.matches(element, pseudo) && second.matches(element, pseudo)
            }
        }
    }

    /// The literal a pseudo-instance guard compares against.
    ///
    /// Attribute conditions with a value and pseudo-classes are guards; ids,
    /// classes and bare `[name]` tests are not.
    #[must_use]
    pub fn guard_literal(&self) -> Option<&str> {
        match self {
            Self::PseudoClass(name) => Some(name),
            Self::Attribute { value, .. } => value.as_deref(),
            _ => None,
        }
    }

    fn specificity(&self) -> Specificity {
        match self {
            Self::Id(_) => Specificity(1, 0, 0),
            Self::Class(_) | Self::PseudoClass(_) | Self::Attribute { .. } => {
                Specificity(0, 1, 0)
            }
            Self::And(first, second) => first.specificity().saturating_add(second.specificity()),
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Self>) {
        match self {
            Self::And(first, second) => {
                first.collect(out);
                second.collect(out);
            }
            other => out.push(other),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Class(class) => write!(f, ".{class}"),
            Self::PseudoClass(name) => write!(f, ":{name}"),
            Self::Attribute {
                name,
                operator,
                value,
            } => match value {
                Some(value) => {
                    write!(f, "[{name}{}", operator.as_str())?;
                    cssparser::serialize_string(value, f)?;
                    f.write_str("]")
                }
                None => write!(f, "[{name}]"),
            },
            Self::And(first, second) => write!(f, "{first}{second}"),
        }
    }
}

/// A complex selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    /// `*`
    Any,
    /// A type selector such as `Button`.
    Element(String),
    /// A simple selector narrowed by a condition (`Button.primary`).
    Conditional {
        /// The simple selector being narrowed.
        simple: Box<Selector>,
        /// The condition.
        condition: Condition,
    },
    /// `ancestor descendant`
    Descendant {
        /// Ancestor part.
        ancestor: Box<Selector>,
        /// Subject part.
        descendant: Box<Selector>,
    },
    /// `parent > child`
    Child {
        /// Parent part.
        parent: Box<Selector>,
        /// Subject part.
        child: Box<Selector>,
    },
}

impl Selector {
    /// Returns `true` if this selector matches `element` when computing the
    /// style of pseudo-instance `pseudo`.
    pub fn matches(&self, element: &dyn Element, pseudo: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Element(name) => element.local_name().eq_ignore_ascii_case(name),
            Self::Conditional { simple, condition } => {
                simple.matches(element, pseudo) && condition.matches(element, pseudo)
            }
            Self::Descendant {
                ancestor,
                descendant,
            } => {
                if !descendant.matches(element, pseudo) {
                    return false;
                }
                let mut current = element.parent_element();
                while let Some(candidate) = current {
                    if ancestor.matches(&*candidate, None) {
                        return true;
                    }
                    current = candidate.parent_element();
                }
                false
            }
            Self::Child { parent, child } => {
                child.matches(element, pseudo)
                    && element
                        .parent_element()
                        .is_some_and(|candidate| parent.matches(&*candidate, None))
            }
        }
    }

    /// Specificity of this selector.
    #[must_use]
    pub fn specificity(&self) -> Specificity {
        match self {
            Self::Any => Specificity::default(),
            Self::Element(_) => Specificity(0, 0, 1),
            Self::Conditional { simple, condition } => {
                simple.specificity().saturating_add(condition.specificity())
            }
            Self::Descendant {
                ancestor: first,
                descendant: second,
            }
            | Self::Child {
                parent: first,
                child: second,
            } => first.specificity().saturating_add(second.specificity()),
        }
    }

    /// All conditions of this selector, including those of combinator parts,
    /// with `And` conditions flattened.
    #[must_use]
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            Self::Any | Self::Element(_) => {}
            Self::Conditional { simple, condition } => {
                simple.collect_conditions(out);
                condition.collect(out);
            }
            Self::Descendant {
                ancestor: first,
                descendant: second,
            }
            | Self::Child {
                parent: first,
                child: second,
            } => {
                first.collect_conditions(out);
                second.collect_conditions(out);
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Element(name) => f.write_str(name),
            Self::Conditional { simple, condition } => match **simple {
                Self::Any => write!(f, "{condition}"),
                _ => write!(f, "{simple}{condition}"),
            },
            Self::Descendant {
                ancestor,
                descendant,
            } => write!(f, "{ancestor} {descendant}"),
            Self::Child { parent, child } => write!(f, "{parent} > {child}"),
        }
    }
}

/// A comma-separated group of selectors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectorList {
    selectors: SmallVec<[Selector; 1]>,
}

impl SelectorList {
    /// Creates a list from selectors.
    pub fn new(selectors: impl IntoIterator<Item = Selector>) -> Self {
        Self {
            selectors: selectors.into_iter().collect(),
        }
    }

    /// Number of selectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Iterates the selectors.
    pub fn iter(&self) -> impl Iterator<Item = &Selector> + '_ {
        self.selectors.iter()
    }

    /// Highest specificity among the selectors that match, or `None` if
    /// none match.
    pub fn match_specificity(
        &self,
        element: &dyn Element,
        pseudo: Option<&str>,
    ) -> Option<Specificity> {
        self.selectors
            .iter()
            .filter(|selector| selector.matches(element, pseudo))
            .map(Selector::specificity)
            .max()
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, selector) in self.selectors.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}
