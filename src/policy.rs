//! Admission and eviction policies.
//!
//! A policy answers exactly two questions: whether a new item should be stored
//! at all (`should_cache`), and which existing items to remove under pressure
//! (`select_for_eviction`). Everything else in the cache is policy-agnostic
//! plumbing.
//!
//! The four concrete policies rank entries by different criteria but share the
//! same selection convention: the worst quartile of the candidate set (rounded
//! up, at least one key) is returned for eviction. Ranking uses a stable sort
//! over the candidates in insertion order, so selection is deterministic.

use std::str::FromStr;
use std::time::Instant;

use crate::adaptive::AdaptivePolicy;
use crate::entry::{EvictionCandidate, Metadata};
use crate::error::CacheError;

/// Values above this many bytes are never admitted by [`SizeAwarePolicy`].
const MAX_ADMISSIBLE_BYTES: usize = 10_000_000;

/// Values above this many bytes need a priority hint above 0.7.
const LARGE_VALUE_BYTES: usize = 1_000_000;

/// Values above this many bytes need a priority hint above 0.4.
const MEDIUM_VALUE_BYTES: usize = 100_000;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Number of keys to evict from a candidate set: the worst quartile,
/// rounded up, never less than one.
pub(crate) fn eviction_quota(len: usize) -> usize {
	len.div_ceil(4).max(1)
}

/// Admission and eviction contract.
///
/// Both operations are pure functions of their inputs; only
/// [`AdaptivePolicy`] carries mutable state, and that state is updated solely
/// through [`AdaptivePolicy::update_effectiveness`].
pub trait CachePolicy {
	/// Decide whether a value should be stored. Called once per `set`; the
	/// cache guarantees `metadata.value_size` is populated beforehand.
	fn should_cache(&self, key: &str, metadata: &Metadata) -> bool;

	/// Given the live entries, return the keys to remove. Candidates arrive in
	/// insertion order.
	fn select_for_eviction(&self, candidates: &[EvictionCandidate], now: Instant) -> Vec<String>;
}

/// Evict whatever was read longest ago. Admits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct LruPolicy;

impl CachePolicy for LruPolicy {
	fn should_cache(&self, _key: &str, _metadata: &Metadata) -> bool {
		true
	}

	fn select_for_eviction(&self, candidates: &[EvictionCandidate], _now: Instant) -> Vec<String> {
		if candidates.is_empty() {
			return Vec::new();
		}
		let mut ranked: Vec<&EvictionCandidate> = candidates.iter().collect();
		ranked.sort_by_key(|c| c.last_access);
		ranked.into_iter().take(eviction_quota(candidates.len())).map(|c| c.key.clone()).collect()
	}
}

/// Evict the least-frequently-read entries. Admits only values expected to be
/// read again (`expected_frequency > 0.3`; absent means never admitted).
#[derive(Debug, Clone, Copy, Default)]
pub struct LfuPolicy;

impl CachePolicy for LfuPolicy {
	fn should_cache(&self, _key: &str, metadata: &Metadata) -> bool {
		metadata.expected_frequency.unwrap_or(0.0) > 0.3
	}

	fn select_for_eviction(&self, candidates: &[EvictionCandidate], _now: Instant) -> Vec<String> {
		if candidates.is_empty() {
			return Vec::new();
		}
		let mut ranked: Vec<&EvictionCandidate> = candidates.iter().collect();
		ranked.sort_by_key(|c| c.access_count);
		ranked.into_iter().take(eviction_quota(candidates.len())).map(|c| c.key.clone()).collect()
	}
}

/// Rank entries by their combined retention score.
///
/// Admission accepts an explicit priority hint above 0.4 when one is given;
/// otherwise it scores the metadata hints:
/// `0.4 * expected_frequency + 0.5 * computation_cost - 0.1 * size_in_mb`,
/// accepting above 0.3. Missing hints count as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityPolicy;

impl CachePolicy for PriorityPolicy {
	fn should_cache(&self, _key: &str, metadata: &Metadata) -> bool {
		match metadata.priority {
			Some(priority) if priority > 0.0 => priority > 0.4,
			_ => {
				let frequency = metadata.expected_frequency.unwrap_or(0.0);
				let cost = metadata.computation_cost.unwrap_or(0.0);
				let size_mb = metadata.value_size.unwrap_or(0) as f64 / BYTES_PER_MB;
				0.4 * frequency + 0.5 * cost - 0.1 * size_mb > 0.3
			}
		}
	}

	fn select_for_eviction(&self, candidates: &[EvictionCandidate], now: Instant) -> Vec<String> {
		worst_by_score(candidates, |c| c.priority_score(now))
	}
}

/// Keep the entries with the best retention score per byte.
///
/// Admission is tiered by value size: oversized values are rejected outright,
/// large values need a strong priority hint, and small values pass freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeAwarePolicy;

impl CachePolicy for SizeAwarePolicy {
	fn should_cache(&self, _key: &str, metadata: &Metadata) -> bool {
		let size = metadata.value_size.unwrap_or(0);
		let priority = metadata.priority.unwrap_or(0.0);

		if size > MAX_ADMISSIBLE_BYTES {
			false
		} else if size > LARGE_VALUE_BYTES {
			priority > 0.7
		} else if size > MEDIUM_VALUE_BYTES {
			priority > 0.4
		} else {
			true
		}
	}

	fn select_for_eviction(&self, candidates: &[EvictionCandidate], now: Instant) -> Vec<String> {
		worst_by_score(candidates, |c| c.priority_score(now) / c.size_estimate.max(1) as f64)
	}
}

/// Stable ascending sort by a float score, worst quartile first.
fn worst_by_score<F>(candidates: &[EvictionCandidate], mut score: F) -> Vec<String>
where
	F: FnMut(&EvictionCandidate) -> f64,
{
	if candidates.is_empty() {
		return Vec::new();
	}
	let mut ranked: Vec<(&EvictionCandidate, f64)> =
		candidates.iter().map(|c| (c, score(c))).collect();
	ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
	ranked.into_iter().take(eviction_quota(candidates.len())).map(|(c, _)| c.key.clone()).collect()
}

/// The closed set of policies a cache can run.
///
/// Concrete policies are plain types implementing [`CachePolicy`]; this enum
/// is what the cache owns, dispatching by match.
#[derive(Debug, Clone)]
pub enum Policy {
	/// Least-recently-used.
	Lru(LruPolicy),
	/// Least-frequently-used.
	Lfu(LfuPolicy),
	/// Retention-score ranking.
	Priority(PriorityPolicy),
	/// Score-per-byte ranking with tiered admission.
	SizeAware(SizeAwarePolicy),
	/// Self-tuning weighted ensemble of the four above.
	Adaptive(AdaptivePolicy),
}

impl Default for Policy {
	fn default() -> Self {
		Policy::Adaptive(AdaptivePolicy::default())
	}
}

impl Policy {
	/// Construct the default policy for a kind.
	pub fn from_kind(kind: PolicyKind) -> Self {
		match kind {
			PolicyKind::Lru => Policy::Lru(LruPolicy),
			PolicyKind::Lfu => Policy::Lfu(LfuPolicy),
			PolicyKind::Priority => Policy::Priority(PriorityPolicy),
			PolicyKind::SizeAware => Policy::SizeAware(SizeAwarePolicy),
			PolicyKind::Adaptive => Policy::Adaptive(AdaptivePolicy::default()),
		}
	}

	/// Stable name used in metrics and configuration.
	pub fn name(&self) -> &'static str {
		match self {
			Policy::Lru(_) => "lru",
			Policy::Lfu(_) => "lfu",
			Policy::Priority(_) => "priority",
			Policy::SizeAware(_) => "size_aware",
			Policy::Adaptive(_) => "adaptive",
		}
	}

	pub(crate) fn as_adaptive(&self) -> Option<&AdaptivePolicy> {
		match self {
			Policy::Adaptive(adaptive) => Some(adaptive),
			_ => None,
		}
	}

	pub(crate) fn as_adaptive_mut(&mut self) -> Option<&mut AdaptivePolicy> {
		match self {
			Policy::Adaptive(adaptive) => Some(adaptive),
			_ => None,
		}
	}
}

impl CachePolicy for Policy {
	fn should_cache(&self, key: &str, metadata: &Metadata) -> bool {
		match self {
			Policy::Lru(p) => p.should_cache(key, metadata),
			Policy::Lfu(p) => p.should_cache(key, metadata),
			Policy::Priority(p) => p.should_cache(key, metadata),
			Policy::SizeAware(p) => p.should_cache(key, metadata),
			Policy::Adaptive(p) => p.should_cache(key, metadata),
		}
	}

	fn select_for_eviction(&self, candidates: &[EvictionCandidate], now: Instant) -> Vec<String> {
		match self {
			Policy::Lru(p) => p.select_for_eviction(candidates, now),
			Policy::Lfu(p) => p.select_for_eviction(candidates, now),
			Policy::Priority(p) => p.select_for_eviction(candidates, now),
			Policy::SizeAware(p) => p.select_for_eviction(candidates, now),
			Policy::Adaptive(p) => p.select_for_eviction(candidates, now),
		}
	}
}

/// Policy kinds for configuration-driven construction.
///
/// # Example
///
/// ```
/// use selective_cache::PolicyKind;
///
/// let kind: PolicyKind = "size_aware".parse().unwrap();
/// assert_eq!(kind, PolicyKind::SizeAware);
/// assert!("mru".parse::<PolicyKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyKind {
	Lru,
	Lfu,
	Priority,
	SizeAware,
	#[default]
	Adaptive,
}

impl FromStr for PolicyKind {
	type Err = CacheError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"lru" => Ok(PolicyKind::Lru),
			"lfu" => Ok(PolicyKind::Lfu),
			"priority" => Ok(PolicyKind::Priority),
			"size_aware" | "size-aware" => Ok(PolicyKind::SizeAware),
			"adaptive" => Ok(PolicyKind::Adaptive),
			other => Err(CacheError::UnknownPolicy(other.to_string())),
		}
	}
}
