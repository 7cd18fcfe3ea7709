use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use rulestore::adapter::{Adapter, DocumentAdapter};
use rulestore::config::AdapterConfig;
use rulestore::domain::{field_window_filters, RuleRecord};
use rulestore::policy::Model;
use rulestore::storage::MemoryStore;

fn rule(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|s| s.to_string()).collect()
}

fn create_test_model(rules: usize) -> Model {
    let mut model = Model::new();
    for i in 0..rules {
        model.add_policy(
            "p",
            "p",
            vec![format!("user{}", i), format!("data{}", i % 50), "read".to_string()],
        );
        if i % 10 == 0 {
            model.add_policy("g", "g", vec![format!("user{}", i), "admin".to_string()]);
        }
    }
    model
}

fn bench_encode_rule(c: &mut Criterion) {
    let fields = rule(&["alice", "data1", "read", "tenant1", "allow", "extra"]);

    c.bench_function("rule_record_encode_to_line", |b| {
        b.iter(|| {
            let record = RuleRecord::from_rule("id", "p", black_box(&fields)).unwrap();
            record.to_text_line()
        })
    });
}

fn bench_decode_document(c: &mut Criterion) {
    let record = RuleRecord::from_rule("id", "p", &rule(&["alice", "data1", "read"])).unwrap();
    let data = serde_json::to_value(record.to_document()).unwrap();

    c.bench_function("rule_record_decode_document", |b| {
        b.iter(|| RuleRecord::from_document("id", black_box(data.clone())).unwrap())
    });
}

fn bench_window_filters(c: &mut Criterion) {
    let values = rule(&["x", "y", "z"]);

    c.bench_function("field_window_filters", |b| {
        b.iter(|| field_window_filters("p", black_box(1), black_box(&values)))
    });
}

fn bench_save_and_load(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let model = create_test_model(1000);

    c.bench_function("save_policy_1000_rules", |b| {
        b.to_async(&rt).iter(|| async {
            let adapter =
                DocumentAdapter::new(Arc::new(MemoryStore::new()), AdapterConfig::default());
            adapter.save_policy(&model).await.unwrap();
        })
    });

    let adapter = DocumentAdapter::new(Arc::new(MemoryStore::new()), AdapterConfig::default());
    rt.block_on(adapter.save_policy(&model)).unwrap();

    c.bench_function("load_policy_1000_rules", |b| {
        b.to_async(&rt).iter(|| async {
            let mut loaded = Model::new();
            adapter.load_policy(&mut loaded).await.unwrap();
            loaded
        })
    });
}

criterion_group!(
    benches,
    bench_encode_rule,
    bench_decode_document,
    bench_window_filters,
    bench_save_and_load,
);
criterion_main!(benches);
