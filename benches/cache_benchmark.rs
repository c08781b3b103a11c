use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use selective_cache::{CacheBuilder, Metadata, PolicyKind, SelectiveCache};

fn admissible_metadata() -> Metadata {
	Metadata::new().expected_frequency(0.8).computation_cost(0.8)
}

fn populated_cache(kind: PolicyKind, entries: u64) -> SelectiveCache<String> {
	let cache = CacheBuilder::new("bench", entries as usize * 2).policy_kind(kind).build();
	for i in 0..entries {
		cache.set_with(&format!("key-{i}"), format!("value-{i}"), None, admissible_metadata());
	}
	cache
}

fn bench_set(c: &mut Criterion) {
	let mut group = c.benchmark_group("set");

	for kind in [PolicyKind::Lru, PolicyKind::SizeAware, PolicyKind::Adaptive] {
		group.throughput(Throughput::Elements(1000));
		group.bench_with_input(BenchmarkId::from_parameter(format!("{kind:?}")), &kind, |b, &kind| {
			b.iter(|| {
				let cache: SelectiveCache<String> =
					CacheBuilder::new("bench", 2048).policy_kind(kind).build();
				for i in 0..1000u64 {
					cache.set_with(
						black_box(&format!("key-{i}")),
						black_box(format!("value-{i}")),
						None,
						admissible_metadata(),
					);
				}
			});
		});
	}

	group.finish();
}

fn bench_get_hit(c: &mut Criterion) {
	let cache = populated_cache(PolicyKind::Lru, 1000);

	c.bench_function("get_hit", |b| {
		b.iter(|| {
			for i in 0..1000u64 {
				black_box(cache.get(black_box(&format!("key-{i}"))));
			}
		});
	});
}

fn bench_get_miss(c: &mut Criterion) {
	let cache = populated_cache(PolicyKind::Lru, 1000);

	c.bench_function("get_miss", |b| {
		b.iter(|| {
			for i in 0..1000u64 {
				black_box(cache.get(black_box(&format!("absent-{i}"))));
			}
		});
	});
}

fn bench_eviction_pressure(c: &mut Criterion) {
	let mut group = c.benchmark_group("eviction_pressure");

	// A small bound forces a cleanup pass on most inserts.
	for kind in [PolicyKind::Lru, PolicyKind::Adaptive] {
		group.bench_with_input(BenchmarkId::from_parameter(format!("{kind:?}")), &kind, |b, &kind| {
			b.iter(|| {
				let cache: SelectiveCache<String> =
					CacheBuilder::new("bench", 64).policy_kind(kind).build();
				for i in 0..1000u64 {
					cache.set_with(
						black_box(&format!("key-{i}")),
						"value".to_string(),
						None,
						admissible_metadata(),
					);
				}
			});
		});
	}

	group.finish();
}

fn bench_mixed_workload(c: &mut Criterion) {
	let cache = populated_cache(PolicyKind::Adaptive, 500);

	c.bench_function("mixed_workload", |b| {
		b.iter(|| {
			for i in 0..1000u64 {
				if i % 4 == 0 {
					cache.set_with(
						&format!("key-{}", i % 600),
						"fresh".to_string(),
						None,
						admissible_metadata(),
					);
				} else {
					black_box(cache.get(&format!("key-{}", i % 600)));
				}
			}
		});
	});
}

criterion_group!(
	benches,
	bench_set,
	bench_get_hit,
	bench_get_miss,
	bench_eviction_pressure,
	bench_mixed_workload
);
criterion_main!(benches);
