//! Self-tuning ensemble of the four base policies.
//!
//! [`AdaptivePolicy`] runs LRU, LFU, priority and size-aware policies side by
//! side and combines their opinions by weighted voting. The weights are not
//! static: callers that can attribute observed hit/miss outcomes to a policy
//! feed an effectiveness score back through [`update_effectiveness`], and the
//! weights are re-derived from exponentially smoothed effectiveness so that
//! policies which keep earning their keep gain influence.
//!
//! The policy owns its weight state; there are no globals. A cache holding an
//! adaptive policy mutates it only under the cache's own lock.
//!
//! [`update_effectiveness`]: AdaptivePolicy::update_effectiveness

use std::collections::BTreeMap;
use std::time::Instant;

use indexmap::IndexMap;
use serde::Serialize;

use crate::entry::{EvictionCandidate, Metadata};
use crate::policy::{CachePolicy, LfuPolicy, LruPolicy, PriorityPolicy, SizeAwarePolicy, eviction_quota};

/// Names of the ensemble members, in voting order.
pub const ADAPTIVE_POLICY_NAMES: [&str; 4] = ["lru", "lfu", "priority", "size_aware"];

/// Initial weights per member, matching [`ADAPTIVE_POLICY_NAMES`].
const INITIAL_WEIGHTS: [f64; 4] = [0.3, 0.2, 0.3, 0.2];

/// Initial effectiveness per member: no evidence either way.
const INITIAL_EFFECTIVENESS: f64 = 0.5;

/// How strongly a new effectiveness observation displaces the smoothed value.
const SMOOTHING_FACTOR: f64 = 0.7;

/// Weighted voting ensemble with effectiveness feedback.
///
/// # Example
///
/// ```
/// use selective_cache::{AdaptivePolicy, CachePolicy, Metadata};
///
/// let mut policy = AdaptivePolicy::default();
///
/// // LRU and size-aware admit a small unhinted value; LFU and priority
/// // reject it. Their combined weight is exactly 0.5, short of a majority.
/// let admitted = policy.should_cache("k", &Metadata::new().value_size(64));
/// assert!(!admitted);
///
/// // Reward the recency-based policy; its weight grows and the vote flips.
/// policy.update_effectiveness("lru", 1.0);
/// assert!(policy.should_cache("k", &Metadata::new().value_size(64)));
/// ```
#[derive(Debug, Clone)]
pub struct AdaptivePolicy {
	lru: LruPolicy,
	lfu: LfuPolicy,
	priority: PriorityPolicy,
	size_aware: SizeAwarePolicy,
	/// Per-member vote weight; kept summing to 1.0.
	weights: [f64; 4],
	/// Exponentially smoothed effectiveness per member, in `0.0..=1.0`.
	effectiveness: [f64; 4],
}

impl Default for AdaptivePolicy {
	fn default() -> Self {
		Self {
			lru: LruPolicy,
			lfu: LfuPolicy,
			priority: PriorityPolicy,
			size_aware: SizeAwarePolicy,
			weights: INITIAL_WEIGHTS,
			effectiveness: [INITIAL_EFFECTIVENESS; 4],
		}
	}
}

impl AdaptivePolicy {
	/// Fold an observed effectiveness score for one member into its smoothed
	/// value and re-derive all weights from effectiveness.
	///
	/// Returns `false` (and changes nothing) for an unknown policy name.
	/// Scores are clamped to `0.0..=1.0`. After any sequence of updates the
	/// weights sum to 1.0 (within floating-point tolerance).
	pub fn update_effectiveness(&mut self, name: &str, score: f64) -> bool {
		let Some(index) = ADAPTIVE_POLICY_NAMES.iter().position(|n| *n == name) else {
			return false;
		};

		let score = score.clamp(0.0, 1.0);
		self.effectiveness[index] =
			SMOOTHING_FACTOR * score + (1.0 - SMOOTHING_FACTOR) * self.effectiveness[index];

		let total: f64 = self.effectiveness.iter().sum();
		if total > 0.0 {
			for (weight, effectiveness) in self.weights.iter_mut().zip(&self.effectiveness) {
				*weight = effectiveness / total;
			}
		}
		true
	}

	/// Current weights keyed by member name.
	pub fn weights(&self) -> BTreeMap<&'static str, f64> {
		ADAPTIVE_POLICY_NAMES.iter().copied().zip(self.weights.iter().copied()).collect()
	}

	/// Current smoothed effectiveness keyed by member name.
	pub fn effectiveness(&self) -> BTreeMap<&'static str, f64> {
		ADAPTIVE_POLICY_NAMES.iter().copied().zip(self.effectiveness.iter().copied()).collect()
	}

	/// Snapshot for metrics reporting.
	pub fn info(&self) -> AdaptiveInfo {
		AdaptiveInfo {
			weights: self.weights(),
			effectiveness: self.effectiveness(),
		}
	}

	fn members(&self) -> [&dyn CachePolicy; 4] {
		[&self.lru, &self.lfu, &self.priority, &self.size_aware]
	}
}

impl CachePolicy for AdaptivePolicy {
	/// Weighted majority: each member votes to admit or not, votes are scaled
	/// by weight and normalized, and the value is admitted above 0.5.
	fn should_cache(&self, key: &str, metadata: &Metadata) -> bool {
		let mut vote = 0.0;
		let mut total = 0.0;
		for (member, weight) in self.members().iter().zip(&self.weights) {
			if member.should_cache(key, metadata) {
				vote += weight;
			}
			total += weight;
		}
		total > 0.0 && vote / total > 0.5
	}

	/// Each member nominates its own worst quartile; every nomination adds the
	/// member's weight to that key. The most-nominated quartile of the whole
	/// candidate set is evicted. Vote accumulation follows member order, so
	/// ties resolve deterministically via the stable sort.
	fn select_for_eviction(&self, candidates: &[EvictionCandidate], now: Instant) -> Vec<String> {
		if candidates.is_empty() {
			return Vec::new();
		}

		let mut votes: IndexMap<String, f64> = IndexMap::new();
		for (member, weight) in self.members().iter().zip(&self.weights) {
			for key in member.select_for_eviction(candidates, now) {
				*votes.entry(key).or_insert(0.0) += weight;
			}
		}

		let mut ranked: Vec<(String, f64)> = votes.into_iter().collect();
		ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
		ranked.into_iter().take(eviction_quota(candidates.len())).map(|(key, _)| key).collect()
	}
}

/// Serializable view of an adaptive policy's tuning state.
#[derive(Debug, Clone, Serialize)]
pub struct AdaptiveInfo {
	pub weights: BTreeMap<&'static str, f64>,
	pub effectiveness: BTreeMap<&'static str, f64>,
}
