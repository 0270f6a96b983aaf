// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parsed CSS property values.
//!
//! [`CssValue`] is a small, owned value tree. It keeps enough structure for
//! property handlers to interpret values without re-tokenizing, and it
//! serializes back to canonical CSS text through [`fmt::Display`]. Equal
//! canonical text means equal values for caching purposes.

use std::fmt::{self, Write as _};

/// Separator between the items of a [`CssValue::List`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ListSeparator {
    /// Items separated by whitespace (`1px solid red`).
    Space,
    /// Items separated by commas (`Arial, sans-serif`).
    Comma,
}

/// A parsed CSS property value.
///
/// # Example
///
/// ```rust
/// use understory_css::{CssParser, CssValue, StyleSheetParser};
///
/// let value = CssParser.parse_property_value("1px solid #FF0000").unwrap();
/// assert!(matches!(value, CssValue::List { .. }));
/// assert_eq!(value.to_string(), "1px solid #FF0000");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum CssValue {
    /// The `inherit` keyword.
    Inherit,
    /// An identifier such as `red` or `bold`.
    Ident(String),
    /// A quoted string, unescaped.
    String(String),
    /// A unitless number.
    Number(f32),
    /// A percentage as written: `50%` is `Percentage(50.0)`.
    Percentage(f32),
    /// A number with a unit such as `12px`.
    Dimension {
        /// The numeric part.
        value: f32,
        /// The unit, as written.
        unit: String,
    },
    /// A hash color such as `#112233`, stored without the `#`.
    Hex(String),
    /// A `url(...)` reference.
    Url(String),
    /// A functional notation such as `rgb(1, 2, 3)`.
    Function {
        /// Function name, as written.
        name: String,
        /// Comma-separated arguments.
        arguments: Vec<CssValue>,
    },
    /// A space- or comma-separated list of values.
    List {
        /// How the items were separated.
        separator: ListSeparator,
        /// The list items.
        items: Vec<CssValue>,
    },
}

impl CssValue {
    /// Returns `true` for the `inherit` keyword.
    #[must_use]
    pub fn is_inherit(&self) -> bool {
        matches!(self, Self::Inherit)
    }

    /// Returns the identifier text, if this value is an identifier.
    #[must_use]
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Self::Ident(ident) => Some(ident),
            _ => None,
        }
    }

    /// Returns the numeric part of numbers, percentages and dimensions.
    #[must_use]
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Self::Number(value) | Self::Percentage(value) | Self::Dimension { value, .. } => {
                Some(*value)
            }
            _ => None,
        }
    }

    /// Returns the list items, or a one-element slice for non-list values.
    #[must_use]
    pub fn items(&self) -> &[Self] {
        match self {
            Self::List { items, .. } => items,
            other => std::slice::from_ref(other),
        }
    }

    /// Returns the canonical CSS text of this value.
    #[must_use]
    pub fn css_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CssValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherit => f.write_str("inherit"),
            Self::Ident(ident) => f.write_str(ident),
            Self::String(text) => cssparser::serialize_string(text, f),
            Self::Number(value) => write!(f, "{value}"),
            Self::Percentage(value) => write!(f, "{value}%"),
            Self::Dimension { value, unit } => write!(f, "{value}{unit}"),
            Self::Hex(hex) => write!(f, "#{hex}"),
            Self::Url(url) => {
                f.write_str("url(")?;
                cssparser::serialize_string(url, f)?;
                f.write_char(')')
            }
            Self::Function { name, arguments } => {
                write!(f, "{name}(")?;
                write_items(f, arguments, ", ")?;
                f.write_char(')')
            }
            Self::List { separator, items } => {
                let separator = match separator {
                    ListSeparator::Space => " ",
                    ListSeparator::Comma => ", ",
                };
                write_items(f, items, separator)
            }
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[CssValue], separator: &str) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
