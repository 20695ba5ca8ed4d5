#![allow(
    clippy::tests_outside_test_module,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    reason = "benchmark"
)]

use std::collections::BTreeMap;
use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use etlate::{Context, Engine, EtlateInterface, Value};

mod utils;

fn etlate_benchmark(c: &mut Criterion) {
    let mut engine = Engine::new();
    engine.add_template("profile", utils::PROFILE_ETLATE).unwrap();

    // Generate 100 random contexts
    let json_contexts = utils::generate_random_contexts(100);

    // Convert JSON contexts to etlate contexts
    let mut contexts: Vec<Context> = json_contexts
        .iter()
        .map(|json_ctx| {
            let serde_json::Value::Object(fields) = json_ctx else {
                unreachable!("contexts are objects")
            };
            fields
                .iter()
                .map(|(name, value)| (name.as_str(), convert(value)))
                .collect()
        })
        .collect();

    utils::print_binary_size();

    let mut group = c.benchmark_group("Template Rendering");
    group.sample_size(50);

    group.bench_function("etlate_render", |b| {
        b.iter(|| {
            for context in &mut contexts {
                black_box(engine.render("profile", context).unwrap());
            }
        });
    });

    group.bench_function("etlate_process", |b| {
        b.iter(|| black_box(etlate::process(utils::PROFILE_ETLATE).unwrap()));
    });

    group.finish();
}

// Convert JSON data to an etlate value
fn convert(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map_or_else(|| Value::Float(n.as_f64().unwrap()), Value::Int),
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(items) => items.iter().map(convert).collect(),
        serde_json::Value::Object(fields) => Value::from(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), convert(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

criterion_group!(benches, etlate_benchmark);
criterion_main!(benches);
