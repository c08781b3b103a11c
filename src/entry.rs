//! Per-entry bookkeeping and priority scoring.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Seconds over which recency decays linearly to zero.
const RECENCY_HORIZON_SECS: f64 = 3600.0;

/// Access count at which the frequency score saturates.
const FREQUENCY_SATURATION: f64 = 10.0;

/// Caller-supplied hints consumed by admission and eviction policies.
///
/// All fields are optional; policies substitute zero for anything missing.
///
/// # Example
///
/// ```
/// use selective_cache::Metadata;
///
/// let meta = Metadata::new().priority(0.8).computation_cost(0.6);
/// assert_eq!(meta.priority, Some(0.8));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
	/// Approximate value size in bytes. Filled in by the cache via
	/// [`EstimateSize`](crate::EstimateSize) when not supplied.
	pub value_size: Option<usize>,
	/// Explicit retention priority in `0.0..=1.0`. Zero means unset.
	pub priority: Option<f64>,
	/// Expected access frequency in `0.0..=1.0`.
	pub expected_frequency: Option<f64>,
	/// Relative cost of recomputing the value in `0.0..=1.0`.
	pub computation_cost: Option<f64>,
}

impl Metadata {
	/// Create empty metadata.
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the value size hint in bytes.
	pub fn value_size(mut self, bytes: usize) -> Self {
		self.value_size = Some(bytes);
		self
	}

	/// Set the explicit retention priority.
	pub fn priority(mut self, priority: f64) -> Self {
		self.priority = Some(priority);
		self
	}

	/// Set the expected access frequency.
	pub fn expected_frequency(mut self, frequency: f64) -> Self {
		self.expected_frequency = Some(frequency);
		self
	}

	/// Set the recomputation cost.
	pub fn computation_cost(mut self, cost: f64) -> Self {
		self.computation_cost = Some(cost);
		self
	}
}

/// One stored value plus its access bookkeeping.
///
/// Entries are owned exclusively by the cache and never handed out; callers
/// receive clones of the value.
pub(crate) struct CacheEntry<T> {
	pub(crate) value: T,
	pub(crate) created_at: Instant,
	pub(crate) last_access: Instant,
	pub(crate) access_count: u64,
	pub(crate) size_estimate: usize,
	pub(crate) ttl: Option<Duration>,
	pub(crate) metadata: Metadata,
}

impl<T> CacheEntry<T> {
	pub(crate) fn new(
		value: T,
		size_estimate: usize,
		ttl: Option<Duration>,
		metadata: Metadata,
		now: Instant,
	) -> Self {
		Self {
			value,
			created_at: now,
			last_access: now,
			access_count: 0,
			size_estimate,
			ttl,
			metadata,
		}
	}

	/// True once the entry's TTL has elapsed. Entries without a TTL never expire.
	pub(crate) fn is_expired(&self, now: Instant) -> bool {
		match self.ttl {
			Some(ttl) => now.saturating_duration_since(self.created_at) > ttl,
			None => false,
		}
	}

	/// Record a successful lookup.
	pub(crate) fn touch(&mut self, now: Instant) {
		self.last_access = now;
		self.access_count += 1;
	}

	/// Snapshot the bookkeeping fields for eviction ranking.
	pub(crate) fn candidate(&self, key: &str) -> EvictionCandidate {
		EvictionCandidate {
			key: key.to_string(),
			last_access: self.last_access,
			access_count: self.access_count,
			size_estimate: self.size_estimate,
			priority: self.metadata.priority.unwrap_or(0.0),
		}
	}
}

/// A value-free snapshot of one entry, handed to policies for ranking.
///
/// Policies never see the stored values or the entries themselves; they rank
/// these snapshots and return the keys to evict.
#[derive(Debug, Clone)]
pub struct EvictionCandidate {
	/// The entry's key.
	pub key: String,
	/// When the entry was last read.
	pub last_access: Instant,
	/// Number of successful lookups since insertion.
	pub access_count: u64,
	/// Approximate size in bytes.
	pub size_estimate: usize,
	/// Explicit priority hint (`0.0` when unset).
	pub priority: f64,
}

impl EvictionCandidate {
	/// Combined retention score in `0.0..=1.0`. Higher scores resist eviction.
	///
	/// Recency decays linearly over one hour; frequency saturates at ten
	/// accesses. An explicit priority hint dominates when present:
	///
	/// - hint set:   `0.6 * hint + 0.25 * recency + 0.15 * frequency`
	/// - hint unset: `0.7 * recency + 0.3 * frequency`
	///
	/// The score is recomputed on demand and never persisted.
	pub fn priority_score(&self, now: Instant) -> f64 {
		let idle = now.saturating_duration_since(self.last_access).as_secs_f64();
		let recency = (1.0 - idle / RECENCY_HORIZON_SECS).clamp(0.0, 1.0);
		let frequency = (self.access_count as f64 / FREQUENCY_SATURATION).min(1.0);

		if self.priority > 0.0 {
			0.6 * self.priority + 0.25 * recency + 0.15 * frequency
		} else {
			0.7 * recency + 0.3 * frequency
		}
	}
}
