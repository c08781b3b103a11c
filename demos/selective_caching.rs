use std::time::Duration;

use selective_cache::{CacheBuilder, Metadata, PolicyKind, SelectiveCache};

/// Example demonstrating selective admission and adaptive self-tuning.

fn main() {
	// A small cache so eviction is easy to observe.
	let cache: SelectiveCache<String> = SelectiveCache::new("responses", 8);

	// Expensive-to-recompute values are worth caching; the adaptive
	// ensemble admits them on the strength of the hints.
	let expensive = Metadata::new().expected_frequency(0.8).computation_cost(0.9);
	let admitted = cache.set_with(
		"response:weather-query",
		"It looks sunny all week.".to_string(),
		None,
		expensive,
	);
	println!("expensive response admitted: {admitted}");

	// A value nothing vouches for is declined outright.
	let admitted = cache.set("response:one-off", "unlikely to be asked again".to_string());
	println!("unhinted response admitted: {admitted}");

	// Fill the cache past its cleanup threshold to trigger eviction.
	for i in 0..20 {
		let meta = Metadata::new().expected_frequency(0.6).computation_cost(0.5);
		cache.set_with(&format!("intent:{i}"), format!("classified-{i}"), None, meta);
	}

	// Keep the weather response hot so recency-based voters protect it.
	for _ in 0..5 {
		cache.get("response:weather-query");
	}

	// Report that the recency signal is paying off; the ensemble reweights.
	cache.update_effectiveness("lru", 0.9);
	cache.update_effectiveness("lfu", 0.3);

	// Session boundaries invalidate per-conversation intents in one call.
	let dropped = cache.invalidate_by_prefix("intent:");
	println!("invalidated {dropped} intent entries");

	// TTL-bound entries disappear on their own.
	cache.set_with(
		"session:token",
		"short-lived".to_string(),
		Some(Duration::from_millis(50)),
		Metadata::new().priority(0.9),
	);
	std::thread::sleep(Duration::from_millis(60));
	println!("expired token lookup: {:?}", cache.get("session:token"));

	let metrics = cache.get_metrics();
	println!("\nCache stats:");
	println!("  Entries: {}/{}", metrics.size, metrics.max_size);
	println!("  Hit rate: {:.2}%", metrics.hit_rate * 100.0);
	println!("  Evictions: {}", metrics.evictions);
	if let Some(adaptive) = metrics.policy.adaptive {
		println!("  Ensemble weights: {:?}", adaptive.weights);
	}

	// A single-policy cache for comparison: size-aware, rejecting oversized
	// payloads no matter what.
	let sized = CacheBuilder::new("blobs", 32).policy_kind(PolicyKind::SizeAware).build::<String>();
	let oversized = Metadata::new().value_size(10_000_001).priority(1.0);
	let admitted = sized.set_with("blob:huge", "...".to_string(), None, oversized);
	println!("\noversized blob admitted: {admitted}");
}
