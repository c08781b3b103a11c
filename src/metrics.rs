//! Cache performance metrics.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::adaptive::AdaptiveInfo;

/// Aggregate counters for one cache instance.
///
/// Mutated only by the cache while holding its lock; callers read a
/// [`MetricsSnapshot`] via `get_metrics()`.
#[derive(Debug, Clone, Default)]
pub(crate) struct CacheMetrics {
	/// Successful lookups.
	pub hits: u64,
	/// Failed lookups (absent or expired).
	pub misses: u64,
	/// Entries removed under capacity pressure. Expiry removals do not count.
	pub evictions: u64,
	/// Accepted inserts.
	pub insertions: u64,
	/// Running average over all lookups, hit or miss.
	pub avg_lookup_time: Duration,
	/// Running average over accepted inserts.
	pub avg_insertion_time: Duration,
	/// Sum of live entries' size estimates in bytes.
	pub memory_usage: usize,
	/// Wall-clock time of the last cleanup pass.
	pub last_cleanup: Option<SystemTime>,
}

impl CacheMetrics {
	/// Hit rate over all lookups so far; 0.0 before the first lookup.
	pub fn hit_rate(&self) -> f64 {
		let total = self.hits + self.misses;
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}

	/// Fold one lookup duration into the running average.
	///
	/// Call after the hit or miss counter has been bumped so the divisor
	/// includes this lookup.
	pub fn record_lookup_time(&mut self, elapsed: Duration) {
		let count = (self.hits + self.misses).max(1);
		self.avg_lookup_time = running_average(self.avg_lookup_time, elapsed, count);
	}

	/// Fold one insertion duration into the running average.
	pub fn record_insertion_time(&mut self, elapsed: Duration) {
		let count = self.insertions.max(1);
		self.avg_insertion_time = running_average(self.avg_insertion_time, elapsed, count);
	}
}

fn running_average(current: Duration, sample: Duration, count: u64) -> Duration {
	let current = current.as_secs_f64();
	Duration::from_secs_f64(current + (sample.as_secs_f64() - current) / count as f64)
}

/// Point-in-time, serializable view of a cache's metrics.
///
/// # Example
///
/// ```
/// use selective_cache::{CacheBuilder, PolicyKind};
///
/// let cache = CacheBuilder::new("responses", 128).policy_kind(PolicyKind::Lru).build::<String>();
/// cache.set("greeting", "hello".to_string());
/// cache.get("greeting");
///
/// let snapshot = cache.get_metrics();
/// assert_eq!(snapshot.hits, 1);
/// assert_eq!(snapshot.hit_rate, 1.0);
/// println!("{}", serde_json::to_string_pretty(&snapshot).unwrap());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
	/// The cache's configured name.
	pub name: String,
	pub hits: u64,
	pub misses: u64,
	pub evictions: u64,
	pub insertions: u64,
	/// `hits / (hits + misses)`, 0.0 before the first lookup.
	pub hit_rate: f64,
	/// Average lookup latency in seconds.
	pub avg_lookup_time: f64,
	/// Average insertion latency in seconds.
	pub avg_insertion_time: f64,
	/// Approximate bytes held by live entries.
	pub memory_usage: usize,
	/// Unix timestamp (seconds) of the last cleanup, if any has run.
	pub last_cleanup_time: Option<f64>,
	/// Current entry count.
	pub size: usize,
	/// Configured entry bound.
	pub max_size: usize,
	/// `size / max_size`, 0.0 for an unbounded-by-zero configuration.
	pub utilization: f64,
	/// Active policy details.
	pub policy: PolicyInfo,
}

/// Which policy the cache runs, plus adaptive tuning state when applicable.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyInfo {
	/// Stable policy name (`"lru"`, `"adaptive"`, ...).
	pub policy: &'static str,
	/// Weights and effectiveness, present only for the adaptive policy.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub adaptive: Option<AdaptiveInfo>,
}

pub(crate) fn unix_seconds(time: SystemTime) -> Option<f64> {
	time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs_f64())
}
