//! Flattener throughput on a generated graph rather than a fixture file.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use devalue::core::flatten::Flattener;
use devalue::core::reducers::ReducerSet;
use devalue::core::value::Value;
use indexmap::IndexMap;

/// A balanced tree of objects `depth` levels deep, `width` children per
/// node, with a leaf string at every node — wide and deep enough to
/// exercise both the identity map and the structural map under load, and
/// a shared leaf array so the dedup path isn't skipped either.
fn build_graph(depth: usize, width: usize) -> Value {
    let shared_leaf = Value::array(vec![Value::Number(1.0), Value::string("leaf")]);
    build_node(depth, width, &shared_leaf)
}

fn build_node(depth: usize, width: usize, shared_leaf: &Value) -> Value {
    let mut fields = IndexMap::new();
    fields.insert("label".to_string(), Value::string("node"));
    fields.insert("shared".to_string(), shared_leaf.clone());
    if depth > 0 {
        let children: Vec<Value> = (0..width).map(|_| build_node(depth - 1, width, shared_leaf)).collect();
        fields.insert("children".to_string(), Value::array(children));
    }
    Value::object(fields)
}

fn bench_flatten(c: &mut Criterion) {
    let graph = build_graph(6, 4);
    let reducers = ReducerSet::new();

    c.bench_function("flatten_balanced_tree_depth6_width4", |b| {
        b.iter(|| {
            let flattened = Flattener::new().flatten(black_box(&graph), &reducers).unwrap();
            black_box(flattened.table.len());
        });
    });
}

criterion_group!(benches, bench_flatten);
criterion_main!(benches);
