//! Tests for async usage patterns.
//!
//! The cache is synchronous, but every operation returns owned data, so
//! nothing is ever held across an await point.

use std::sync::Arc;
use std::time::Duration;

use selective_cache::{CacheBuilder, Metadata, PolicyKind, SelectiveCache};

fn shared_cache(max_size: usize) -> Arc<SelectiveCache<String>> {
	Arc::new(CacheBuilder::new("async", max_size).policy_kind(PolicyKind::Lru).build())
}

#[tokio::test]
async fn test_get_across_await_points() {
	let cache = shared_cache(64);

	cache.set("k", "async test".to_string());

	// The value is cloned out; holding it across an await is safe.
	if let Some(value) = cache.get("k") {
		tokio::time::sleep(Duration::from_millis(1)).await;
		assert_eq!(value, "async test");
	} else {
		panic!("expected a hit");
	}
}

#[tokio::test]
async fn test_shared_across_tasks() {
	let cache = shared_cache(1024);
	let mut handles = vec![];

	for t in 0..4u64 {
		let cache = Arc::clone(&cache);
		handles.push(tokio::spawn(async move {
			for i in 0..50u64 {
				let key = format!("task{t}:{i}");
				cache.set(&key, format!("value-{i}"));
				tokio::task::yield_now().await;

				if let Some(value) = cache.get(&key) {
					assert_eq!(value, format!("value-{i}"));
				}
			}
		}));
	}

	for handle in handles {
		handle.await.unwrap();
	}

	assert_eq!(cache.get_metrics().insertions, 200);
}

#[tokio::test]
async fn test_ttl_expiry_under_async_sleep() {
	let cache = shared_cache(64);

	cache.set_with("token", "ephemeral".to_string(), Some(Duration::from_millis(20)), Metadata::new());
	assert_eq!(cache.get("token"), Some("ephemeral".to_string()));

	tokio::time::sleep(Duration::from_millis(40)).await;

	assert_eq!(cache.get("token"), None);
	assert!(!cache.contains("token"));
}

#[tokio::test]
async fn test_concurrent_effectiveness_feedback() {
	let cache: Arc<SelectiveCache<String>> = Arc::new(SelectiveCache::new("async-adaptive", 64));
	let mut handles = vec![];

	for name in ["lru", "lfu", "priority", "size_aware"] {
		let cache = Arc::clone(&cache);
		handles.push(tokio::spawn(async move {
			for i in 0..25 {
				cache.update_effectiveness(name, (i % 10) as f64 / 10.0);
				tokio::task::yield_now().await;
			}
		}));
	}

	for handle in handles {
		handle.await.unwrap();
	}

	let info = cache.get_metrics().policy.adaptive.unwrap();
	let total: f64 = info.weights.values().sum();
	assert!((total - 1.0).abs() < 1e-9);
}
