use std::time::Duration;

use crate::cache::SelectiveCache;
use crate::error::CacheError;
use crate::estimate::EstimateSize;
use crate::policy::{Policy, PolicyKind};

/// Builder for configuring a [`SelectiveCache`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use selective_cache::{CacheBuilder, PolicyKind};
///
/// let cache = CacheBuilder::new("model-outputs", 512)
///     .policy_kind(PolicyKind::SizeAware)
///     .default_ttl(Duration::from_secs(300))
///     .build::<String>();
///
/// assert_eq!(cache.max_size(), 512);
/// ```
///
/// Configuration loaders that carry the policy as a string can use
/// [`try_policy_kind`](Self::try_policy_kind), which fails with
/// [`CacheError::UnknownPolicy`] for unsupported kinds:
///
/// ```
/// use selective_cache::CacheBuilder;
///
/// assert!(CacheBuilder::new("c", 64).try_policy_kind("adaptive").is_ok());
/// assert!(CacheBuilder::new("c", 64).try_policy_kind("mru").is_err());
/// ```
pub struct CacheBuilder {
	name: String,
	max_size: usize,
	policy: Policy,
	default_ttl: Option<Duration>,
}

impl CacheBuilder {
	/// Create a builder for a cache bounded to `max_size` entries.
	///
	/// Defaults: adaptive policy, no default TTL.
	pub fn new(name: impl Into<String>, max_size: usize) -> Self {
		Self {
			name: name.into(),
			max_size,
			policy: Policy::default(),
			default_ttl: None,
		}
	}

	/// Set the admission/eviction policy.
	pub fn policy(mut self, policy: Policy) -> Self {
		self.policy = policy;
		self
	}

	/// Set the policy by kind, with default configuration for that kind.
	pub fn policy_kind(mut self, kind: PolicyKind) -> Self {
		self.policy = Policy::from_kind(kind);
		self
	}

	/// Set the policy from its configuration name.
	///
	/// # Errors
	///
	/// [`CacheError::UnknownPolicy`] if `kind` is not a supported policy name.
	pub fn try_policy_kind(self, kind: &str) -> Result<Self, CacheError> {
		let kind: PolicyKind = kind.parse()?;
		Ok(self.policy_kind(kind))
	}

	/// TTL applied to entries inserted without an explicit TTL.
	pub fn default_ttl(mut self, ttl: Duration) -> Self {
		self.default_ttl = Some(ttl);
		self
	}

	/// Build the cache with the configured settings.
	pub fn build<T: EstimateSize + Clone>(self) -> SelectiveCache<T> {
		SelectiveCache::from_parts(self.name, self.max_size, self.policy, self.default_ttl)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_defaults() {
		let cache = CacheBuilder::new("c", 64).build::<String>();
		assert_eq!(cache.max_size(), 64);
		assert_eq!(cache.get_metrics().policy.policy, "adaptive");
	}

	#[test]
	fn test_builder_policy_kind() {
		let cache = CacheBuilder::new("c", 64).policy_kind(PolicyKind::Lru).build::<u64>();
		assert_eq!(cache.get_metrics().policy.policy, "lru");
	}

	#[test]
	fn test_builder_unknown_policy_kind() {
		let result = CacheBuilder::new("c", 64).try_policy_kind("two-queue");
		assert!(matches!(result, Err(CacheError::UnknownPolicy(kind)) if kind == "two-queue"));
	}

	#[test]
	fn test_builder_default_ttl() {
		let cache = CacheBuilder::new("c", 64)
			.policy_kind(PolicyKind::Lru)
			.default_ttl(Duration::from_secs(1))
			.build::<String>();

		cache.set("k", "v".to_string());
		assert!(cache.contains("k"));
	}
}
