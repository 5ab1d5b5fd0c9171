//! # Form Benchmarks
//!
//! Schema resolution, materialization and serialization costs.
//!
//! Run with: `cargo bench -p teleporter-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;
use teleporter_core::{
    EntityKind, EntityValue, KvStore, MemoryStore, SchemaRegistry, Space, materialize,
};

fn existing_address(arguments: usize) -> EntityValue {
    let args: serde_json::Map<String, Value> = (0..arguments)
        .map(|i| (format!("arg.{i}"), Value::String(format!("value-{i}"))))
        .collect();
    match json!({
        "key": "a1",
        "category": "elasticsearch5",
        "client": { "hosts": "es1:9300,es2:9300", "settings": { "cluster.name": "prod" } },
        "arguments": args,
    }) {
        Value::Object(map) => map,
        _ => EntityValue::new(),
    }
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_resolve(c: &mut Criterion) {
    let registry = SchemaRegistry::new();
    c.bench_function("resolve_form_schema/address", |b| {
        b.iter(|| {
            registry
                .resolve_form_schema(EntityKind::Address, Some(black_box("kafka_consumer")))
                .expect("schema")
        })
    });
}

fn bench_materialize(c: &mut Criterion) {
    let registry = SchemaRegistry::new();
    let schema = registry
        .resolve_form_schema(EntityKind::Address, Some("elasticsearch5"))
        .expect("schema");
    let mut group = c.benchmark_group("materialize");

    for size in [0, 16, 256] {
        let value = existing_address(size);
        group.bench_with_input(BenchmarkId::new("arguments", size), &value, |b, value| {
            b.iter(|| materialize(black_box(&schema), black_box(value)).expect("form"))
        });
    }

    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let registry = SchemaRegistry::new();
    let schema = registry
        .resolve_form_schema(EntityKind::Address, Some("elasticsearch5"))
        .expect("schema");
    let form = materialize(&schema, &existing_address(64)).expect("form");
    c.bench_function("serialize/address", |b| b.iter(|| black_box(&form).serialize()));
}

fn bench_range(c: &mut Criterion) {
    let mut store = MemoryStore::new();
    for ns in 0..10 {
        for t in 0..500 {
            store
                .put(Space::Config, &format!("/task/ns{ns}/t{t}"), json!({}))
                .expect("put");
        }
    }
    c.bench_function("range/namespace", |b| {
        b.iter(|| {
            store
                .range(Space::Config, black_box("/task/ns1"), 0, 2000)
                .expect("range")
        })
    });
}

criterion_group!(
    benches,
    bench_resolve,
    bench_materialize,
    bench_serialize,
    bench_range
);
criterion_main!(benches);
