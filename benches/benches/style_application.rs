// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_css_engine` styling passes.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use understory_css::{CssValue, Element};
use understory_css_engine::{
    ANY_WIDGET_TYPE, DefaultStyles, PropertyHandler, Stylable, StyleEngine, StyleError,
    TypedHandlerProvider, ValueConverter, WidgetElement, WidgetId,
};

/// A balanced tree stored as `(kind, parent, children)` triples.
struct Tree {
    nodes: Vec<(&'static str, Option<u64>, Vec<u64>)>,
}

impl Tree {
    fn new(fanout: u64, depth: u32) -> Rc<Self> {
        let mut nodes = vec![("Shell", None, Vec::new())];
        let mut level = vec![0_u64];
        for d in 0..depth {
            let mut next = Vec::new();
            for parent in level {
                for _ in 0..fanout {
                    let id = nodes.len() as u64;
                    let kind = if d + 1 == depth { "Button" } else { "Composite" };
                    nodes.push((kind, Some(parent), Vec::new()));
                    nodes[parent as usize].2.push(id);
                    next.push(id);
                }
            }
            level = next;
        }
        Rc::new(Self { nodes })
    }
}

struct Widget {
    tree: Rc<Tree>,
    id: u64,
    pseudo: Vec<String>,
    defaults: DefaultStyles,
}

impl Widget {
    fn new(tree: &Rc<Tree>, id: u64) -> Self {
        Self {
            tree: tree.clone(),
            id,
            pseudo: vec!["hover".into()],
            defaults: DefaultStyles::new(),
        }
    }
}

impl Element for Widget {
    fn local_name(&self) -> &str {
        self.tree.nodes[self.id as usize].0
    }

    fn parent_element(&self) -> Option<Rc<dyn Element>> {
        let parent = self.tree.nodes[self.id as usize].1?;
        Some(Rc::new(Self::new(&self.tree, parent)))
    }
}

impl WidgetElement for Widget {
    fn widget(&self) -> WidgetId {
        WidgetId::new(self.id)
    }

    fn parent_widget(&self) -> Option<WidgetId> {
        self.tree.nodes[self.id as usize].1.map(WidgetId::new)
    }

    fn children(&self) -> Vec<WidgetId> {
        self.tree.nodes[self.id as usize]
            .2
            .iter()
            .copied()
            .map(WidgetId::new)
            .collect()
    }

    fn stylable(&self) -> Option<&dyn Stylable> {
        Some(self)
    }
}

impl Stylable for Widget {
    fn default_styles(&self) -> &DefaultStyles {
        &self.defaults
    }

    fn static_pseudo_instances(&self) -> &[String] {
        &self.pseudo
    }
}

/// Resolves colors through the engine's converters.
struct Color(RefCell<u64>);

impl PropertyHandler for Color {
    fn apply_property(
        &self,
        _element: &Rc<dyn WidgetElement>,
        _property: &str,
        value: Option<&CssValue>,
        _pseudo: Option<&str>,
        engine: &StyleEngine,
    ) -> Result<bool, StyleError> {
        if let Some(value) = value {
            engine.convert(value, TypeId::of::<String>(), None)?;
        }
        *self.0.borrow_mut() += 1;
        Ok(true)
    }
}

struct Text;

impl ValueConverter for Text {
    fn target_type(&self) -> TypeId {
        TypeId::of::<String>()
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

fn engine_for(tree: &Rc<Tree>) -> StyleEngine {
    let provider_tree = tree.clone();
    let provider = move |widget: WidgetId, _: &StyleEngine| {
        ((widget.get() as usize) < provider_tree.nodes.len())
            .then(|| Rc::new(Widget::new(&provider_tree, widget.get())) as Rc<dyn WidgetElement>)
    };
    let engine = StyleEngine::builder()
        .element_provider(Rc::new(provider))
        .build();
    let color = Rc::new(Color(RefCell::new(0)));
    let mut handlers = TypedHandlerProvider::new();
    handlers
        .register(ANY_WIDGET_TYPE, "color", color.clone())
        .register(ANY_WIDGET_TYPE, "background-color", color);
    engine.register_property_handler_provider(Rc::new(handlers));
    engine.register_value_converter(Rc::new(Text));
    let loaded = engine.parse_style_sheet(
        r#"
        Shell { background-color: white }
        Composite { background-color: #eeeeee }
        Composite > Button { color: black }
        Button[state="hover"] { color: #336699 }
        Shell Button:hover { background-color: #dddddd }
        "#,
    );
    if let Err(error) = loaded {
        engine.handle_error(&error);
    }
    engine
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/apply_styles");
    for (fanout, depth) in [(4_u64, 3_u32), (8, 3)] {
        let tree = Tree::new(fanout, depth);
        let engine = engine_for(&tree);
        // Warm the element contexts so the loop measures styling only.
        engine.apply_styles(WidgetId::new(0), true);
        group.bench_function(BenchmarkId::new("tree", tree.nodes.len()), |b| {
            b.iter(|| engine.apply_styles(black_box(WidgetId::new(0)), true))
        });
    }
    group.finish();

    let tree = Tree::new(2, 1);
    let engine = engine_for(&tree);
    let mut group = c.benchmark_group("engine/declaration");
    group.bench_function("parse_and_apply", |b| {
        b.iter(|| {
            black_box(engine.parse_and_apply_style_declaration(
                WidgetId::new(1),
                black_box("color: red; background-color: #fff"),
            ))
        })
    });
    group.bench_function("convert_cached", |b| {
        let value = CssValue::Hex("336699".into());
        b.iter(|| black_box(engine.convert(&value, TypeId::of::<String>(), None)))
    });
    group.finish();
}

criterion_group!(benches, bench_apply);
criterion_main!(benches);
