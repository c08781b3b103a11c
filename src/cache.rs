use std::time::{Duration, Instant, SystemTime};

use ahash::RandomState;
use indexmap::IndexMap;
use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, warn};

use crate::entry::{CacheEntry, EvictionCandidate, Metadata};
use crate::error::CacheError;
use crate::estimate::{DEFAULT_SIZE_ESTIMATE, EstimateSize};
use crate::metrics::{CacheMetrics, MetricsSnapshot, PolicyInfo, unix_seconds};
use crate::policy::{CachePolicy, Policy};

/// Fraction of `max_size` at which a `set` runs cleanup before inserting.
const CLEANUP_THRESHOLD: f64 = 0.9;

/// Thread-safe selective cache. Can be shared across threads via
/// `Arc<SelectiveCache<T>>`.
///
/// Every operation is synchronous and bounded by the entry count; there is no
/// background eviction thread. All methods are safe to call from async
/// contexts because no lock is ever held across a caller-visible suspension
/// point — values are returned by clone.
///
/// # Admission and eviction
///
/// A `set` first asks the active [`Policy`] whether the value is worth
/// storing at all; a rejected value is simply not cached (`set` returns
/// `false`). Once the store reaches 90% of `max_size`, the next accepted
/// `set` runs a cleanup pass inline: expired entries are dropped first, and
/// if the store is still at capacity the policy picks the worst quartile of
/// live entries to evict.
///
/// The bound is soft by design: cleanup runs before the new entry is
/// inserted, so the store can transiently hold one entry above `max_size`
/// until the next cleanup.
///
/// # Example
///
/// ```
/// use selective_cache::{Metadata, SelectiveCache};
///
/// let cache: SelectiveCache<String> = SelectiveCache::new("responses", 256);
///
/// let meta = Metadata::new().expected_frequency(0.8).computation_cost(0.9);
/// assert!(cache.set_with("intent:greeting", "hello!".to_string(), None, meta));
/// assert_eq!(cache.get("intent:greeting"), Some("hello!".to_string()));
/// ```
pub struct SelectiveCache<T> {
	/// Instance name, used in log output and metrics.
	name: String,
	/// The whole mutable state behind one lock: lookups mutate access
	/// bookkeeping, so even `get` takes the write half.
	inner: RwLock<CacheInner<T>>,
}

struct CacheInner<T> {
	/// Insertion-ordered store; order is what makes eviction deterministic.
	entries: IndexMap<String, CacheEntry<T>, RandomState>,
	policy: Policy,
	metrics: CacheMetrics,
	max_size: usize,
	default_ttl: Option<Duration>,
}

impl<T: EstimateSize + Clone> SelectiveCache<T> {
	/// Create a cache bounded to `max_size` entries with the default
	/// [adaptive policy](crate::AdaptivePolicy) and no default TTL.
	///
	/// Use [`CacheBuilder`](crate::CacheBuilder) to configure the policy or a
	/// default TTL.
	pub fn new(name: impl Into<String>, max_size: usize) -> Self {
		Self::from_parts(name.into(), max_size, Policy::default(), None)
	}

	pub(crate) fn from_parts(
		name: String,
		max_size: usize,
		policy: Policy,
		default_ttl: Option<Duration>,
	) -> Self {
		Self {
			name,
			inner: RwLock::new(CacheInner {
				entries: IndexMap::with_hasher(RandomState::new()),
				policy,
				metrics: CacheMetrics::default(),
				max_size,
				default_ttl,
			}),
		}
	}

	/// Look up a value, cloning it out of the cache.
	///
	/// A hit refreshes the entry's access bookkeeping. An expired entry is
	/// removed and reported as a miss. Never panics and never errors.
	pub fn get(&self, key: &str) -> Option<T> {
		let started = Instant::now();
		let mut inner = self.inner.write();
		let now = Instant::now();

		let expired = matches!(inner.entries.get(key), Some(entry) if entry.is_expired(now));
		if expired && let Some(entry) = inner.entries.shift_remove(key) {
			inner.metrics.memory_usage =
				inner.metrics.memory_usage.saturating_sub(entry.size_estimate);
		}

		let value = if expired {
			None
		} else if let Some(entry) = inner.entries.get_mut(key) {
			entry.touch(now);
			Some(entry.value.clone())
		} else {
			None
		};

		if value.is_some() {
			inner.metrics.hits += 1;
		} else {
			inner.metrics.misses += 1;
		}
		inner.metrics.record_lookup_time(started.elapsed());

		value
	}

	/// Look up a value, falling back to `default` on a miss.
	///
	/// Accounting is identical to [`get`](Self::get): the fallback still
	/// counts as a miss.
	pub fn get_or(&self, key: &str, default: T) -> T {
		self.get(key).unwrap_or(default)
	}

	/// Store a value with no per-entry TTL or metadata hints.
	///
	/// Equivalent to `set_with(key, value, None, Metadata::new())`; the
	/// cache's default TTL still applies. Returns `false` if the active
	/// policy declined to admit the value.
	pub fn set(&self, key: &str, value: T) -> bool {
		self.set_with(key, value, None, Metadata::new())
	}

	/// Store a value with an optional TTL override and policy hints.
	///
	/// If `metadata.value_size` is unset it is filled from the value's
	/// [`EstimateSize`] implementation; estimation failure falls back to a
	/// fixed default and logs a warning, it never fails the insert. The
	/// populated metadata is then put to the active policy for admission.
	///
	/// Returns `true` if the value was stored.
	pub fn set_with(
		&self,
		key: &str,
		value: T,
		ttl: Option<Duration>,
		mut metadata: Metadata,
	) -> bool {
		let started = Instant::now();

		if metadata.value_size.is_none() {
			metadata.value_size = Some(value.estimate_size().unwrap_or_else(|| {
				warn!(
					cache = %self.name,
					key,
					fallback = DEFAULT_SIZE_ESTIMATE,
					"size estimation failed, using fallback"
				);
				DEFAULT_SIZE_ESTIMATE
			}));
		}

		let mut inner = self.inner.write();

		if !inner.policy.should_cache(key, &metadata) {
			return false;
		}

		let threshold = (inner.max_size as f64 * CLEANUP_THRESHOLD) as usize;
		if inner.entries.len() >= threshold {
			Self::cleanup_locked(&mut inner, &self.name);
		}

		let now = Instant::now();
		let size = metadata.value_size.unwrap_or(DEFAULT_SIZE_ESTIMATE);
		let ttl = ttl.or(inner.default_ttl);
		let entry = CacheEntry::new(value, size, ttl, metadata, now);

		if let Some(old) = inner.entries.insert(key.to_string(), entry) {
			inner.metrics.memory_usage =
				inner.metrics.memory_usage.saturating_sub(old.size_estimate);
		}
		inner.metrics.memory_usage += size;
		inner.metrics.insertions += 1;
		inner.metrics.record_insertion_time(started.elapsed());

		true
	}

	/// Remove a key. Returns `true` if it was present.
	pub fn delete(&self, key: &str) -> bool {
		let mut inner = self.inner.write();
		match inner.entries.shift_remove(key) {
			Some(entry) => {
				inner.metrics.memory_usage =
					inner.metrics.memory_usage.saturating_sub(entry.size_estimate);
				true
			}
			None => false,
		}
	}

	/// Remove all entries. Counters other than `memory_usage` persist.
	pub fn clear(&self) {
		let mut inner = self.inner.write();
		inner.entries.clear();
		inner.metrics.memory_usage = 0;
	}

	/// Remove every key matching `pattern`, returning how many were removed.
	///
	/// # Errors
	///
	/// [`CacheError::InvalidPattern`] if the pattern does not compile as a
	/// regex.
	pub fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
		let regex = Regex::new(pattern)?;
		let mut inner = self.inner.write();

		let matching: Vec<String> =
			inner.entries.keys().filter(|key| regex.is_match(key)).cloned().collect();
		for key in &matching {
			if let Some(entry) = inner.entries.shift_remove(key) {
				inner.metrics.memory_usage =
					inner.metrics.memory_usage.saturating_sub(entry.size_estimate);
			}
		}

		Ok(matching.len())
	}

	/// Remove every key starting with `prefix`, returning how many were
	/// removed.
	pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
		let mut inner = self.inner.write();

		let matching: Vec<String> =
			inner.entries.keys().filter(|key| key.starts_with(prefix)).cloned().collect();
		for key in &matching {
			if let Some(entry) = inner.entries.shift_remove(key) {
				inner.metrics.memory_usage =
					inner.metrics.memory_usage.saturating_sub(entry.size_estimate);
			}
		}

		matching.len()
	}

	/// Check for a live (present and unexpired) key without touching access
	/// bookkeeping or hit/miss counters.
	pub fn contains(&self, key: &str) -> bool {
		let inner = self.inner.read();
		let now = Instant::now();
		matches!(inner.entries.get(key), Some(entry) if !entry.is_expired(now))
	}

	/// Snapshot the cache's metrics, including policy tuning state when the
	/// adaptive policy is active.
	pub fn get_metrics(&self) -> MetricsSnapshot {
		let inner = self.inner.read();
		let size = inner.entries.len();

		MetricsSnapshot {
			name: self.name.clone(),
			hits: inner.metrics.hits,
			misses: inner.metrics.misses,
			evictions: inner.metrics.evictions,
			insertions: inner.metrics.insertions,
			hit_rate: inner.metrics.hit_rate(),
			avg_lookup_time: inner.metrics.avg_lookup_time.as_secs_f64(),
			avg_insertion_time: inner.metrics.avg_insertion_time.as_secs_f64(),
			memory_usage: inner.metrics.memory_usage,
			last_cleanup_time: inner.metrics.last_cleanup.and_then(unix_seconds),
			size,
			max_size: inner.max_size,
			utilization: if inner.max_size == 0 {
				0.0
			} else {
				size as f64 / inner.max_size as f64
			},
			policy: PolicyInfo {
				policy: inner.policy.name(),
				adaptive: inner.policy.as_adaptive().map(|a| a.info()),
			},
		}
	}

	/// All live keys in insertion order. Expired-but-unreaped keys are
	/// filtered out.
	pub fn get_keys(&self) -> Vec<String> {
		let inner = self.inner.read();
		let now = Instant::now();
		inner
			.entries
			.iter()
			.filter(|(_, entry)| !entry.is_expired(now))
			.map(|(key, _)| key.clone())
			.collect()
	}

	/// Current entry count, including entries that have expired but not yet
	/// been reaped.
	pub fn get_size(&self) -> usize {
		self.inner.read().entries.len()
	}

	/// Approximate bytes held by live entries.
	pub fn get_memory_usage(&self) -> usize {
		self.inner.read().metrics.memory_usage
	}

	/// The configured entry bound.
	pub fn max_size(&self) -> usize {
		self.inner.read().max_size
	}

	/// The cache's name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Change the entry bound. Shrinking below the current entry count runs a
	/// cleanup pass immediately.
	pub fn set_max_size(&self, max_size: usize) {
		let mut inner = self.inner.write();
		inner.max_size = max_size;
		if inner.entries.len() > max_size {
			Self::cleanup_locked(&mut inner, &self.name);
		}
	}

	/// Swap the active policy. Existing entries are kept; the new policy
	/// governs subsequent admission and eviction decisions.
	pub fn update_policy(&self, policy: Policy) {
		self.inner.write().policy = policy;
	}

	/// Feed an observed effectiveness score back to the adaptive policy.
	///
	/// Returns `false` if the active policy is not adaptive or the name does
	/// not match an ensemble member. See
	/// [`AdaptivePolicy::update_effectiveness`](crate::AdaptivePolicy::update_effectiveness).
	pub fn update_effectiveness(&self, policy_name: &str, score: f64) -> bool {
		let mut inner = self.inner.write();
		match inner.policy.as_adaptive_mut() {
			Some(adaptive) => adaptive.update_effectiveness(policy_name, score),
			None => false,
		}
	}

	/// Purge expired entries, then evict per policy if still at capacity.
	///
	/// Expiry removals are not counted as evictions.
	fn cleanup_locked(inner: &mut CacheInner<T>, name: &str) {
		let now = Instant::now();

		let expired: Vec<String> = inner
			.entries
			.iter()
			.filter(|(_, entry)| entry.is_expired(now))
			.map(|(key, _)| key.clone())
			.collect();
		for key in &expired {
			if let Some(entry) = inner.entries.shift_remove(key) {
				inner.metrics.memory_usage =
					inner.metrics.memory_usage.saturating_sub(entry.size_estimate);
			}
		}

		// Under the inline-cleanup flow one quartile pass is enough; after a
		// drastic set_max_size shrink further rounds run until the bound holds.
		let mut evicted = 0usize;
		while inner.entries.len() >= inner.max_size && !inner.entries.is_empty() {
			let candidates: Vec<EvictionCandidate> =
				inner.entries.iter().map(|(key, entry)| entry.candidate(key)).collect();
			let victims = inner.policy.select_for_eviction(&candidates, now);

			let mut removed = 0usize;
			for key in &victims {
				if let Some(entry) = inner.entries.shift_remove(key) {
					inner.metrics.memory_usage =
						inner.metrics.memory_usage.saturating_sub(entry.size_estimate);
					inner.metrics.evictions += 1;
					removed += 1;
				}
			}
			evicted += removed;
			if removed == 0 {
				break;
			}
		}

		if !expired.is_empty() || evicted > 0 {
			debug!(
				cache = name,
				expired = expired.len(),
				evicted,
				remaining = inner.entries.len(),
				"cleanup pass"
			);
		}
		inner.metrics.last_cleanup = Some(SystemTime::now());
	}
}

impl<T> std::fmt::Debug for SelectiveCache<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.inner.read();
		f.debug_struct("SelectiveCache")
			.field("name", &self.name)
			.field("size", &inner.entries.len())
			.field("max_size", &inner.max_size)
			.field("policy", &inner.policy.name())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::thread;

	use super::*;
	use crate::builder::CacheBuilder;
	use crate::policy::{LfuPolicy, LruPolicy, PolicyKind};

	fn lru_cache(max_size: usize) -> SelectiveCache<String> {
		CacheBuilder::new("test", max_size).policy(Policy::Lru(LruPolicy)).build()
	}

	#[test]
	fn test_set_and_get() {
		let cache = lru_cache(16);

		assert!(cache.set("a", "alpha".to_string()));
		assert_eq!(cache.get("a"), Some("alpha".to_string()));
		assert_eq!(cache.get("missing"), None);
	}

	#[test]
	fn test_get_or_returns_default_on_miss() {
		let cache = lru_cache(16);
		assert_eq!(cache.get_or("absent", "fallback".to_string()), "fallback");

		let metrics = cache.get_metrics();
		assert_eq!(metrics.misses, 1);
	}

	#[test]
	fn test_rejected_set_stores_nothing() {
		let cache: SelectiveCache<String> =
			CacheBuilder::new("test", 16).policy(Policy::Lfu(LfuPolicy)).build();

		// LFU rejects values without an expected-frequency hint.
		assert!(!cache.set("a", "alpha".to_string()));
		assert_eq!(cache.get_size(), 0);
		assert_eq!(cache.get_memory_usage(), 0);

		let meta = Metadata::new().expected_frequency(0.9);
		assert!(cache.set_with("a", "alpha".to_string(), None, meta));
		assert_eq!(cache.get_size(), 1);
	}

	#[test]
	fn test_delete() {
		let cache = lru_cache(16);
		cache.set("a", "alpha".to_string());

		assert!(cache.delete("a"));
		assert!(!cache.delete("a"));
		assert_eq!(cache.get("a"), None);
		assert_eq!(cache.get_memory_usage(), 0);
	}

	#[test]
	fn test_clear_preserves_counters() {
		let cache = lru_cache(16);
		cache.set("a", "alpha".to_string());
		cache.get("a");
		cache.clear();

		assert_eq!(cache.get_size(), 0);
		assert_eq!(cache.get_memory_usage(), 0);

		let metrics = cache.get_metrics();
		assert_eq!(metrics.hits, 1);
		assert_eq!(metrics.insertions, 1);
	}

	#[test]
	fn test_replacing_a_key_adjusts_memory_usage() {
		let cache = lru_cache(16);

		cache.set("a", "x".repeat(100));
		assert_eq!(cache.get_memory_usage(), 200);

		cache.set("a", "x".repeat(10));
		assert_eq!(cache.get_memory_usage(), 20);
		assert_eq!(cache.get_size(), 1);
	}

	#[test]
	fn test_expired_get_is_a_miss_and_reaps() {
		let cache = lru_cache(16);
		cache.set_with("k", "v".to_string(), Some(Duration::from_millis(10)), Metadata::new());

		assert_eq!(cache.get("k"), Some("v".to_string()));

		thread::sleep(Duration::from_millis(20));
		assert_eq!(cache.get("k"), None);
		assert_eq!(cache.get_size(), 0);

		let metrics = cache.get_metrics();
		assert_eq!(metrics.hits, 1);
		assert_eq!(metrics.misses, 1);
	}

	#[test]
	fn test_default_ttl_applies_when_unset() {
		let cache: SelectiveCache<String> = CacheBuilder::new("test", 16)
			.policy(Policy::Lru(LruPolicy))
			.default_ttl(Duration::from_millis(10))
			.build();

		cache.set("short", "v".to_string());
		cache.set_with("long", "v".to_string(), Some(Duration::from_secs(60)), Metadata::new());

		thread::sleep(Duration::from_millis(20));
		assert_eq!(cache.get("short"), None);
		assert_eq!(cache.get("long"), Some("v".to_string()));
	}

	#[test]
	fn test_cleanup_keeps_size_bounded() {
		let cache = lru_cache(8);

		for i in 0..100 {
			cache.set(&format!("k{i}"), format!("value-{i}"));
		}

		// Soft bound: at most one entry above max_size between cleanups.
		assert!(cache.get_size() <= 8 + 1);
		assert!(cache.get_metrics().evictions > 0);
	}

	#[test]
	fn test_invalidate_by_prefix() {
		let cache = lru_cache(16);
		cache.set("intent:abc", "1".to_string());
		cache.set("intent:def", "2".to_string());
		cache.set("response:xyz", "3".to_string());

		assert_eq!(cache.invalidate_by_prefix("intent:"), 2);
		assert_eq!(cache.get_keys(), vec!["response:xyz".to_string()]);
	}

	#[test]
	fn test_invalidate_by_pattern() {
		let cache = lru_cache(16);
		cache.set("user:1:profile", "p".to_string());
		cache.set("user:2:profile", "p".to_string());
		cache.set("user:1:settings", "s".to_string());

		let removed = cache.invalidate_by_pattern(r"^user:\d+:profile$").unwrap();
		assert_eq!(removed, 2);
		assert_eq!(cache.get_size(), 1);
	}

	#[test]
	fn test_invalidate_by_pattern_rejects_bad_regex() {
		let cache = lru_cache(16);
		cache.set("a", "1".to_string());

		assert!(matches!(
			cache.invalidate_by_pattern("[unclosed"),
			Err(CacheError::InvalidPattern(_))
		));
		assert_eq!(cache.get_size(), 1);
	}

	#[test]
	fn test_set_max_size_shrink_triggers_cleanup() {
		let cache = lru_cache(64);
		for i in 0..32 {
			cache.set(&format!("k{i}"), "v".to_string());
		}
		assert_eq!(cache.get_size(), 32);

		cache.set_max_size(8);
		assert!(cache.get_size() <= 8);
		assert_eq!(cache.max_size(), 8);
	}

	#[test]
	fn test_update_policy_swaps_admission_behavior() {
		let cache = lru_cache(16);
		assert!(cache.set("a", "v".to_string()));

		cache.update_policy(Policy::from_kind(PolicyKind::Lfu));
		assert!(!cache.set("b", "v".to_string()));
		assert_eq!(cache.get_metrics().policy.policy, "lfu");
	}

	#[test]
	fn test_update_effectiveness_requires_adaptive() {
		let cache = lru_cache(16);
		assert!(!cache.update_effectiveness("lru", 1.0));

		let adaptive: SelectiveCache<String> = SelectiveCache::new("test", 16);
		assert!(adaptive.update_effectiveness("lru", 1.0));
		assert!(!adaptive.update_effectiveness("clock", 1.0));
	}

	#[test]
	fn test_metrics_accounting_identity() {
		let cache = lru_cache(16);
		cache.set("a", "v".to_string());

		for i in 0..10 {
			if i % 2 == 0 {
				cache.get("a");
			} else {
				cache.get("absent");
			}
		}

		let metrics = cache.get_metrics();
		assert_eq!(metrics.hits + metrics.misses, 10);
		assert_eq!(metrics.hit_rate, 0.5);
		assert!(metrics.avg_lookup_time >= 0.0);
	}

	#[test]
	fn test_concurrent_access() {
		let cache = Arc::new(lru_cache(1024));
		let mut handles = vec![];

		for t in 0..4u64 {
			let cache = Arc::clone(&cache);
			handles.push(thread::spawn(move || {
				for i in 0..100u64 {
					let key = format!("k{}", t * 100 + i);
					cache.set(&key, format!("value-{i}"));
					if let Some(value) = cache.get(&key) {
						assert_eq!(value, format!("value-{i}"));
					}
				}
			}));
		}

		for handle in handles {
			handle.join().unwrap();
		}

		let metrics = cache.get_metrics();
		assert_eq!(metrics.insertions, 400);
	}

	#[test]
	fn test_cache_is_send_sync() {
		fn assert_send<T: Send>() {}
		fn assert_sync<T: Sync>() {}

		assert_send::<SelectiveCache<String>>();
		assert_sync::<SelectiveCache<String>>();
	}
}
