#![doc = include_str!("../README.md")]

mod adaptive;
mod builder;
mod cache;
mod entry;
mod error;
mod estimate;
mod metrics;
mod policy;

pub use adaptive::{ADAPTIVE_POLICY_NAMES, AdaptiveInfo, AdaptivePolicy};
pub use builder::CacheBuilder;
pub use cache::SelectiveCache;
pub use entry::{EvictionCandidate, Metadata};
pub use error::CacheError;
pub use estimate::{DEFAULT_SIZE_ESTIMATE, EstimateSize, estimate_serialized};
pub use metrics::{MetricsSnapshot, PolicyInfo};
pub use policy::{
	CachePolicy, LfuPolicy, LruPolicy, Policy, PolicyKind, PriorityPolicy, SizeAwarePolicy,
};
