// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text → stylesheet parsing.
//!
//! [`StyleSheetParser`] is the seam the style engine parses through.
//! [`CssParser`] is the reference implementation on top of the `cssparser`
//! tokenizer. It understands style rules with type, universal, id, class,
//! pseudo-class and attribute selectors joined by descendant and child
//! combinators; at-rules are skipped with a warning.

use cssparser::{
    BasicParseErrorKind, Delimiter, ParseError as CssParseError, ParseErrorKind as CssErrorKind,
    Parser, ParserInput, SourceLocation, ToCss, Token,
};
use smallvec::SmallVec;

use crate::declaration::StyleDeclaration;
use crate::selector::{AttributeOperator, Condition, Selector, SelectorList};
use crate::stylesheet::{StyleRule, StyleSheet, StyleSheetBuilder};
use crate::value::{CssValue, ListSeparator};

/// What went wrong while parsing.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    /// A token that cannot appear at this position.
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    /// Input ended early.
    #[error("unexpected end of input")]
    EndOfInput,
    /// A selector was required but none was found.
    #[error("expected a selector")]
    ExpectedSelector,
    /// A declaration or value had no value tokens.
    #[error("empty value")]
    EmptyValue,
    /// Any other syntax error reported by the tokenizer.
    #[error("invalid syntax")]
    Invalid,
}

/// A parse failure with its 1-based source position.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {line}:{column}")]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl From<CssParseError<'_, ParseErrorKind>> for ParseError {
    fn from(error: CssParseError<'_, ParseErrorKind>) -> Self {
        let kind = match error.kind {
            CssErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(token)) => {
                ParseErrorKind::UnexpectedToken(token.to_css_string())
            }
            CssErrorKind::Basic(BasicParseErrorKind::EndOfInput) => ParseErrorKind::EndOfInput,
            CssErrorKind::Basic(_) => ParseErrorKind::Invalid,
            CssErrorKind::Custom(kind) => kind,
        };
        Self {
            kind,
            line: error.location.line + 1,
            column: error.location.column,
        }
    }
}

/// Parses stylesheet text.
pub trait StyleSheetParser {
    /// Parses a full stylesheet.
    fn parse_style_sheet(&self, text: &str) -> Result<StyleSheet, ParseError>;

    /// Parses the body of a declaration block (`color: red; margin: 0`).
    fn parse_style_declaration(&self, text: &str) -> Result<StyleDeclaration, ParseError>;

    /// Parses a comma-separated selector list.
    fn parse_selectors(&self, text: &str) -> Result<SelectorList, ParseError>;

    /// Parses a single property value.
    fn parse_property_value(&self, text: &str) -> Result<CssValue, ParseError>;
}

/// Reference [`StyleSheetParser`] built on `cssparser`.
///
/// ```rust
/// use understory_css::{CssParser, StyleSheetParser};
///
/// let sheet = CssParser
///     .parse_style_sheet("Button, Label { color: red; } Button:hover { color: blue }")
///     .unwrap();
/// assert_eq!(sheet.len(), 2);
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct CssParser;

type ParseResult<'i, T> = Result<T, CssParseError<'i, ParseErrorKind>>;

impl StyleSheetParser for CssParser {
    fn parse_style_sheet(&self, text: &str) -> Result<StyleSheet, ParseError> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let mut builder = StyleSheetBuilder::new();
        loop {
            parser.skip_whitespace();
            if parser.is_exhausted() {
                break;
            }
            let location = parser.current_source_location();
            let state = parser.state();
            let at_rule = match parser.next() {
                Ok(Token::AtKeyword(name)) => Some(name.to_string()),
                Ok(_) => None,
                Err(_) => break,
            };
            if let Some(name) = at_rule {
                skip_at_rule(&mut parser);
                log::warn!(
                    "skipping unsupported at-rule @{name} at {}:{}",
                    location.line + 1,
                    location.column
                );
                continue;
            }
            parser.reset(&state);
            builder.push(parse_rule(&mut parser)?);
        }
        Ok(builder.build())
    }

    fn parse_style_declaration(&self, text: &str) -> Result<StyleDeclaration, ParseError> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        Ok(parser.parse_entirely(|p| parse_declarations(p))?)
    }

    fn parse_selectors(&self, text: &str) -> Result<SelectorList, ParseError> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        Ok(parser.parse_entirely(|p| parse_selector_list(p))?)
    }

    fn parse_property_value(&self, text: &str) -> Result<CssValue, ParseError> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        Ok(parser.parse_entirely(|p| parse_value(p))?)
    }
}

fn skip_at_rule(parser: &mut Parser<'_, '_>) {
    loop {
        match parser.next() {
            Ok(Token::Semicolon | Token::CurlyBracketBlock) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

fn parse_rule<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, StyleRule> {
    let selectors =
        parser.parse_until_before(Delimiter::CurlyBracketBlock, |p| parse_selector_list(p))?;
    parser.expect_curly_bracket_block()?;
    let declaration = parser.parse_nested_block(|p| parse_declarations(p))?;
    Ok(StyleRule::new(selectors, declaration))
}

fn parse_selector_list<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, SelectorList> {
    let selectors = parser.parse_comma_separated(|p| parse_selector(p))?;
    Ok(SelectorList::new(selectors))
}

#[derive(Copy, Clone)]
enum Combinator {
    Descendant,
    Child,
}

fn parse_selector<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, Selector> {
    parser.skip_whitespace();
    let mut selector = parse_compound(parser)?;
    loop {
        let mut saw_whitespace = false;
        let combinator = loop {
            let location = parser.current_source_location();
            let state = parser.state();
            let token = match parser.next_including_whitespace() {
                Ok(token) => token.clone(),
                Err(_) => return Ok(selector),
            };
            match token {
                Token::WhiteSpace(_) => saw_whitespace = true,
                Token::Delim('>') => break Combinator::Child,
                _ if saw_whitespace => {
                    parser.reset(&state);
                    break Combinator::Descendant;
                }
                other => return Err(location.new_unexpected_token_error(other)),
            }
        };
        parser.skip_whitespace();
        let next = parse_compound(parser)?;
        selector = match combinator {
            Combinator::Descendant => Selector::Descendant {
                ancestor: Box::new(selector),
                descendant: Box::new(next),
            },
            Combinator::Child => Selector::Child {
                parent: Box::new(selector),
                child: Box::new(next),
            },
        };
    }
}

fn parse_compound<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, Selector> {
    let start = parser.current_source_location();
    let mut simple = None;
    let mut conditions: SmallVec<[Condition; 2]> = SmallVec::new();
    let mut consumed = false;
    loop {
        let state = parser.state();
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Ident(name) if !consumed => simple = Some(Selector::Element(name.to_string())),
            Token::Delim('*') if !consumed => simple = Some(Selector::Any),
            Token::IDHash(id) => conditions.push(Condition::Id(id.to_string())),
            Token::Delim('.') => {
                let class = parser.expect_ident_cloned()?;
                conditions.push(Condition::Class(class.to_string()));
            }
            Token::Colon => {
                let name = parser.expect_ident_cloned()?;
                conditions.push(Condition::PseudoClass(name.to_string()));
            }
            Token::SquareBracketBlock => {
                conditions.push(parser.parse_nested_block(|p| parse_attribute(p))?);
            }
            _ => {
                parser.reset(&state);
                break;
            }
        }
        consumed = true;
    }
    if !consumed {
        return Err(start.new_custom_error(ParseErrorKind::ExpectedSelector));
    }
    let simple = simple.unwrap_or(Selector::Any);
    let condition = conditions
        .into_iter()
        .reduce(|first, second| Condition::And(Box::new(first), Box::new(second)));
    Ok(match condition {
        Some(condition) => Selector::Conditional {
            simple: Box::new(simple),
            condition,
        },
        None => simple,
    })
}

fn parse_attribute<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, Condition> {
    let name = parser.expect_ident()?.to_string();
    let location = parser.current_source_location();
    let operator = match parser.next() {
        Err(_) => {
            return Ok(Condition::Attribute {
                name,
                operator: AttributeOperator::Exists,
                value: None,
            });
        }
        Ok(Token::Delim('=')) => AttributeOperator::Equals,
        Ok(Token::IncludeMatch) => AttributeOperator::Includes,
        Ok(Token::DashMatch) => AttributeOperator::DashMatch,
        Ok(Token::PrefixMatch) => AttributeOperator::Prefix,
        Ok(Token::SuffixMatch) => AttributeOperator::Suffix,
        Ok(Token::SubstringMatch) => AttributeOperator::Substring,
        Ok(other) => {
            let other = other.clone();
            return Err(location.new_unexpected_token_error(other));
        }
    };
    let value = parser.expect_ident_or_string()?.to_string();
    Ok(Condition::Attribute {
        name,
        operator,
        value: Some(value),
    })
}

fn parse_declarations<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, StyleDeclaration> {
    let mut declaration = StyleDeclaration::new();
    loop {
        parser.skip_whitespace();
        if parser.is_exhausted() {
            break;
        }
        let location = parser.current_source_location();
        let name = match parser.next()? {
            Token::Semicolon => continue,
            Token::Ident(name) => name.to_string(),
            other => {
                let other = other.clone();
                return Err(location.new_unexpected_token_error(other));
            }
        };
        parser.expect_colon()?;
        let (value, important) =
            parser.parse_until_after(Delimiter::Semicolon, |p| parse_declaration_value(p))?;
        declaration.set_property_with_priority(name, value, important);
    }
    Ok(declaration)
}

fn parse_declaration_value<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, (CssValue, bool)> {
    let value = parse_value(parser)?;
    let important = parser
        .try_parse(|p| {
            p.expect_delim('!')?;
            p.expect_ident_matching("important")
        })
        .is_ok();
    Ok((value, important))
}

/// Parses a value up to the end of input or a `!` priority marker.
fn parse_value<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, CssValue> {
    let location = parser.current_source_location();
    let groups = parse_groups(parser)?;
    fold_groups(groups, ListSeparator::Comma)
        .ok_or_else(|| location.new_custom_error(ParseErrorKind::EmptyValue))
}

fn parse_arguments<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, Vec<CssValue>> {
    let location = parser.current_source_location();
    let groups = parse_groups(parser)?;
    if groups.len() == 1 && groups[0].is_empty() {
        return Ok(Vec::new());
    }
    groups
        .into_iter()
        .map(|group| fold_group(group).ok_or_else(|| empty_value(location)))
        .collect()
}

fn empty_value<'i>(location: SourceLocation) -> CssParseError<'i, ParseErrorKind> {
    location.new_custom_error(ParseErrorKind::EmptyValue)
}

/// Comma-separated groups of space-separated items.
fn parse_groups<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, Vec<Vec<CssValue>>> {
    let mut groups = vec![Vec::new()];
    loop {
        parser.skip_whitespace();
        let location = parser.current_source_location();
        let state = parser.state();
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let item = match token {
            Token::Comma => {
                groups.push(Vec::new());
                continue;
            }
            Token::Delim('!') => {
                parser.reset(&state);
                break;
            }
            Token::Ident(ident) if ident.eq_ignore_ascii_case("inherit") => CssValue::Inherit,
            Token::Ident(ident) => CssValue::Ident(ident.to_string()),
            Token::QuotedString(text) => CssValue::String(text.to_string()),
            Token::Number { value, .. } => CssValue::Number(value),
            Token::Percentage {
                unit_value,
                int_value,
                ..
            } => CssValue::Percentage(match int_value {
                Some(int) => int as f32,
                None => unit_value * 100.0,
            }),
            Token::Dimension { value, unit, .. } => CssValue::Dimension {
                value,
                unit: unit.to_string(),
            },
            Token::Hash(hex) | Token::IDHash(hex) => CssValue::Hex(hex.to_string()),
            Token::UnquotedUrl(url) => CssValue::Url(url.to_string()),
            Token::Function(name) if name.eq_ignore_ascii_case("url") => {
                let url = parser.parse_nested_block(|p| parse_url_argument(p))?;
                CssValue::Url(url)
            }
            Token::Function(name) => {
                let arguments = parser.parse_nested_block(|p| parse_arguments(p))?;
                CssValue::Function {
                    name: name.to_string(),
                    arguments,
                }
            }
            other => return Err(location.new_unexpected_token_error(other)),
        };
        if let Some(group) = groups.last_mut() {
            group.push(item);
        }
    }
    Ok(groups)
}

fn parse_url_argument<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, String> {
    Ok(parser.expect_string()?.to_string())
}

fn fold_group(mut items: Vec<CssValue>) -> Option<CssValue> {
    match items.len() {
        0 => None,
        1 => items.pop(),
        _ => Some(CssValue::List {
            separator: ListSeparator::Space,
            items,
        }),
    }
}

fn fold_groups(groups: Vec<Vec<CssValue>>, separator: ListSeparator) -> Option<CssValue> {
    let mut items = groups
        .into_iter()
        .map(fold_group)
        .collect::<Option<Vec<_>>>()?;
    if items.len() == 1 {
        return items.pop();
    }
    Some(CssValue::List { separator, items })
}
