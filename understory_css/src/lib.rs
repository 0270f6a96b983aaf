// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory CSS: values, selectors, stylesheets and a reference cascade.
//!
//! This crate is the CSS model the style engine in `understory_css_engine`
//! consumes. It has no notion of widgets: anything implementing [`Element`]
//! can be matched.
//!
//! ## Core Concepts
//!
//! ### Parsing
//!
//! [`StyleSheetParser`] parses stylesheets, declaration blocks, selector lists
//! and single values. [`CssParser`] implements it on the `cssparser`
//! tokenizer. Errors carry a 1-based position.
//!
//! ```rust
//! use understory_css::{CssParser, CssValue, StyleSheetParser};
//!
//! let style = CssParser.parse_style_declaration("color: red; margin: 2px 4px").unwrap();
//! assert_eq!(style.property_value("color"), Some(&CssValue::Ident("red".into())));
//!
//! let error = CssParser.parse_style_declaration("color red").unwrap_err();
//! assert_eq!(error.line, 1);
//! ```
//!
//! ### Cascade
//!
//! A [`DocumentCss`] holds the sheets in effect. [`ViewCss`] implements
//! [`CascadeResolver`]: for an element and an optional pseudo-instance it
//! merges the declarations of every matching rule and records the
//! highest-ranked rule as the result's parent rule.
//!
//! ```rust
//! use std::rc::Rc;
//! use understory_css::{
//!     CascadeResolver, CssParser, CssValue, DocumentCss, Element, StyleSheetParser, ViewCss,
//! };
//!
//! struct Button;
//!
//! impl Element for Button {
//!     fn local_name(&self) -> &str {
//!         "Button"
//!     }
//!     fn parent_element(&self) -> Option<Rc<dyn Element>> {
//!         None
//!     }
//! }
//!
//! let document = Rc::new(DocumentCss::new());
//! document.add_style_sheet(
//!     CssParser
//!         .parse_style_sheet("Button { color: red } Button:hover { color: blue }")
//!         .unwrap(),
//! );
//! let view = ViewCss::new(document);
//!
//! let hover = view.computed_style(&Button, Some("hover")).unwrap();
//! assert_eq!(hover.property_value("color"), Some(&CssValue::Ident("blue".into())));
//! let base = view.computed_style(&Button, None).unwrap();
//! assert_eq!(base.property_value("color"), Some(&CssValue::Ident("red".into())));
//! ```

mod cascade;
mod declaration;
mod parser;
mod selector;
mod stylesheet;
mod value;

pub use cascade::{CascadeResolver, ViewCss};
pub use declaration::{PropertyDeclaration, StyleDeclaration};
pub use parser::{CssParser, ParseError, ParseErrorKind, StyleSheetParser};
pub use selector::{AttributeOperator, Condition, Element, Selector, SelectorList, Specificity};
pub use stylesheet::{DocumentCss, StyleRule, StyleSheet, StyleSheetBuilder};
pub use value::{CssValue, ListSeparator};
