//! Benchmarks for PipeKV engine operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pipekv::Engine;

fn engine_benchmarks(c: &mut Criterion) {
    c.bench_function("write_single_pair", |b| {
        let engine = Engine::new();
        let mut i = 0u64;
        b.iter(|| {
            let pair = vec![(format!("key-{}", i % 1000), "value".to_string())];
            engine.write(black_box(&pair));
            i += 1;
        });
    });

    c.bench_function("read_hot_key", |b| {
        let engine = Engine::new();
        engine.write(&[("hot".to_string(), "value".to_string())]);
        let keys = vec!["hot".to_string()];
        b.iter(|| engine.read(black_box(&keys)));
    });

    c.bench_function("show_1000_keys", |b| {
        let engine = Engine::new();
        for i in 0..1000 {
            engine.write(&[(format!("key-{:04}", i), "value".to_string())]);
        }
        b.iter(|| black_box(engine.show()));
    });
}

criterion_group!(benches, engine_benchmarks);
criterion_main!(benches);
