// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resource memoization and engine teardown.

mod common;

use std::any::{Any, TypeId};
use std::cell::Cell;
use std::rc::Rc;

use common::{NativeHandler, Tree, TreeProvider};
use understory_css::CssValue;
use understory_css_engine::{
    ANY_WIDGET_TYPE, ResourceCache, ResourceRegistry, StyleEngine, StyleError,
    TypedHandlerProvider, ValueConverter,
};

#[derive(Debug, PartialEq)]
struct Rgb(u8, u8, u8);

/// Converts hex and a few named colors, counting every conversion.
#[derive(Default)]
struct RgbConverter {
    conversions: Cell<u32>,
}

impl ValueConverter for RgbConverter {
    fn target_type(&self) -> TypeId {
        TypeId::of::<Rgb>()
    }

    fn convert(
        &self,
        value: &CssValue,
        _engine: &StyleEngine,
        _context: Option<&dyn Any>,
    ) -> Result<Option<Rc<dyn Any>>, StyleError> {
        self.conversions.set(self.conversions.get() + 1);
        let rgb = match value {
            CssValue::Hex(hex) if hex.len() == 6 => {
                let channel = |at: usize| {
                    u8::from_str_radix(&hex[at..at + 2], 16).map_err(StyleError::conversion::<Rgb>)
                };
                Rgb(channel(0)?, channel(2)?, channel(4)?)
            }
            CssValue::Ident(name) if name == "red" => Rgb(255, 0, 0),
            _ => return Ok(None),
        };
        Ok(Some(Rc::new(rgb)))
    }

    fn to_css_text(
        &self,
        resource: &dyn Any,
        _engine: &StyleEngine,
        _context: Option<&dyn Any>,
    ) -> Result<Option<String>, StyleError> {
        Ok(resource
            .downcast_ref::<Rgb>()
            .map(|Rgb(r, g, b)| format!("#{r:02x}{g:02x}{b:02x}")))
    }
}

fn hex(text: &str) -> CssValue {
    CssValue::Hex(text.into())
}

#[test]
fn equal_values_share_one_resource() {
    let engine = StyleEngine::default();
    let converter = Rc::new(RgbConverter::default());
    engine.register_value_converter(converter.clone());

    let first = engine.convert_to::<Rgb>(&hex("FF0000"), None).unwrap().unwrap();
    let again = engine.convert_to::<Rgb>(&hex("ff0000"), None).unwrap().unwrap();
    assert!(Rc::ptr_eq(&first, &again));
    assert_eq!(*first, Rgb(255, 0, 0));
    assert_eq!(converter.conversions.get(), 1);

    // Same color, different text: a separate resource.
    let named = engine
        .convert_to::<Rgb>(&CssValue::Ident("red".into()), None)
        .unwrap()
        .unwrap();
    assert!(!Rc::ptr_eq(&first, &named));
    assert_eq!(converter.conversions.get(), 2);

    assert_eq!(
        engine
            .convert_to_css_text(&*first, TypeId::of::<Rgb>(), None)
            .unwrap()
            .as_deref(),
        Some("#ff0000")
    );
}

#[test]
fn inherit_and_unconvertible_values_are_not_cached() {
    let cache = Rc::new(ResourceCache::new());
    let engine = StyleEngine::builder()
        .resource_registry(Some(cache.clone() as Rc<dyn ResourceRegistry>))
        .build();
    let converter = Rc::new(RgbConverter::default());
    engine.register_value_converter(converter.clone());

    for _ in 0..2 {
        assert!(engine.convert_to::<Rgb>(&CssValue::Inherit, None).unwrap().is_none());
        assert!(engine.convert_to::<Rgb>(&hex("abc"), None).unwrap().is_none());
    }
    assert_eq!(converter.conversions.get(), 4);
    assert!(cache.is_empty());
}

#[test]
fn without_a_registry_every_conversion_runs() {
    let engine = StyleEngine::builder().resource_registry(None).build();
    let converter = Rc::new(RgbConverter::default());
    engine.register_value_converter(converter.clone());

    let first = engine.convert_to::<Rgb>(&hex("000000"), None).unwrap().unwrap();
    let again = engine.convert_to::<Rgb>(&hex("000000"), None).unwrap().unwrap();
    assert!(!Rc::ptr_eq(&first, &again));
    assert_eq!(converter.conversions.get(), 2);
}

#[test]
fn converters_can_be_replaced_and_removed() {
    let engine = StyleEngine::builder().resource_registry(None).build();
    let target = TypeId::of::<Rgb>();
    assert!(engine.convert(&hex("000000"), target, None).unwrap().is_none());

    engine.register_value_converter(Rc::new(RgbConverter::default()));
    assert!(engine.value_converter(target).is_some());
    assert!(matches!(
        engine.convert_to::<Rgb>(&hex("00zz00"), None),
        Err(StyleError::Conversion { .. })
    ));

    assert!(engine.unregister_value_converter(target).is_some());
    assert!(engine.value_converter(target).is_none());
    assert!(engine.convert_to::<Rgb>(&hex("000000"), None).unwrap().is_none());
}

/// Claims to produce [`Rgb`] but hands out strings.
struct Mislabeled;

impl ValueConverter for Mislabeled {
    fn target_type(&self) -> TypeId {
        TypeId::of::<Rgb>()
    }

    fn convert(
        &self,
        value: &CssValue,
        _engine: &StyleEngine,
        _context: Option<&dyn Any>,
    ) -> Result<Option<Rc<dyn Any>>, StyleError> {
        Ok(Some(Rc::new(value.css_text())))
    }
}

#[test]
fn typed_conversion_checks_the_resource_type() {
    let engine = StyleEngine::default();
    engine.register_value_converter(Rc::new(Mislabeled));
    assert!(matches!(
        engine.convert_to::<Rgb>(&hex("000000"), None),
        Err(StyleError::Conversion { .. })
    ));
}

#[test]
fn dispose_tears_everything_down_once() {
    let tree = Tree::new();
    let root = tree.add("Shell", None);
    let left = tree.add("Label", Some(root));
    let right = tree.add("Label", Some(root));

    let cache = Rc::new(ResourceCache::new());
    let engine = StyleEngine::builder()
        .element_provider(TreeProvider::new(&tree))
        .resource_registry(Some(cache.clone() as Rc<dyn ResourceRegistry>))
        .build();
    let mut handlers = TypedHandlerProvider::new();
    handlers.register(ANY_WIDGET_TYPE, "color", NativeHandler::new(&tree));
    engine.register_property_handler_provider(Rc::new(handlers));
    engine.register_value_converter(Rc::new(RgbConverter::default()));

    engine.parse_style_sheet("Label { color: #336699 }").unwrap();
    engine.apply_styles(root, true);
    engine.convert_to::<Rgb>(&hex("336699"), None).unwrap();
    assert_eq!(engine.context_count(), 3);
    assert_eq!(cache.len(), 1);

    engine.dispose();
    for widget in [root, left, right] {
        assert_eq!(tree.read(widget, |node| node.disposed), 1);
    }
    assert_eq!(engine.context_count(), 0);
    assert!(cache.is_empty());
    assert!(engine.document().is_empty());

    engine.dispose();
    assert_eq!(tree.read(root, |node| node.disposed), 1);
}

#[test]
fn disposed_widgets_lose_their_context() {
    let tree = Tree::new();
    let widget = tree.add("Label", None);
    let provider = TreeProvider::new(&tree);
    let engine = StyleEngine::builder()
        .element_provider(provider.clone())
        .build();

    let first = engine.element(widget).unwrap();
    assert!(engine.set_element_data(widget, "tooltip", Rc::new("hello")));
    engine.handle_widget_disposed(widget);
    assert_eq!(engine.context_count(), 0);
    assert!(engine.element_context(widget).is_none());
    assert!(engine.element_data(widget, "tooltip").is_none());
    assert_eq!(tree.read(widget, |node| node.disposed), 0);

    // The widget is adapted afresh when it shows up again.
    let second = engine.element(widget).unwrap();
    assert!(!Rc::ptr_eq(&first, &second));
    assert_eq!(*provider.hooked.borrow(), [widget, widget]);
}
