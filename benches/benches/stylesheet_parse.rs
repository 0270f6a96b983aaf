// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_css` parsing and cascade resolution.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::rc::Rc;

use understory_css::{
    CascadeResolver, CssParser, DocumentCss, Element, StyleSheetParser, ViewCss,
};

fn sheet_text(rules: usize) -> String {
    let mut text = String::new();
    for i in 0..rules {
        text.push_str(&format!(
            "Shell > Composite.row{i} Button[state=\"hover\"], #item{i} {{ color: #{i:06x}; font: bold 12px \"Segoe UI\", sans-serif; margin: 1px 2px 3px {i}px !important; }}\n"
        ));
    }
    text
}

struct Node {
    name: &'static str,
    class: String,
    parent: Option<Rc<Node>>,
}

impl Element for Node {
    fn local_name(&self) -> &str {
        self.name
    }

    fn has_class(&self, class: &str) -> bool {
        self.class == class
    }

    fn parent_element(&self) -> Option<Rc<dyn Element>> {
        self.parent.clone().map(|parent| parent as Rc<dyn Element>)
    }
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("css/parse");
    for rules in [16_usize, 256] {
        let text = sheet_text(rules);
        group.bench_function(BenchmarkId::new("style_sheet", rules), |b| {
            b.iter(|| black_box(CssParser.parse_style_sheet(black_box(&text))))
        });
    }
    group.bench_function("declaration", |b| {
        b.iter(|| {
            black_box(CssParser.parse_style_declaration(black_box(
                "color: #336699; background-color: rgb(10, 20, 30); font: italic 12px serif; border: 1px solid red",
            )))
        })
    });
    group.bench_function("selectors", |b| {
        b.iter(|| {
            black_box(CssParser.parse_selectors(black_box(
                "Shell Composite > Button.primary:hover, Label[state=\"pressed\"], #ok",
            )))
        })
    });
    group.finish();
}

fn bench_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("css/cascade");
    for rules in [16_usize, 256] {
        let document = Rc::new(DocumentCss::new());
        if let Ok(sheet) = CssParser.parse_style_sheet(&sheet_text(rules)) {
            document.add_style_sheet(sheet);
        }
        let view = ViewCss::new(document);
        let shell = Rc::new(Node {
            name: "Shell",
            class: String::new(),
            parent: None,
        });
        let row = Rc::new(Node {
            name: "Composite",
            class: "row3".into(),
            parent: Some(shell),
        });
        let button = Node {
            name: "Button",
            class: String::new(),
            parent: Some(row),
        };
        group.bench_function(BenchmarkId::new("computed_style", rules), |b| {
            b.iter(|| black_box(view.computed_style(&button, Some("hover"))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_cascade);
criterion_main!(benches);
