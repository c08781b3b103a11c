//! Best-effort value size estimation.
//!
//! The cache needs an approximate byte count per entry to drive size-aware
//! admission and the `memory_usage` metric. Estimates are deliberately cheap:
//! scalars count as a fixed word size, strings as two bytes per character, and
//! large collections are sampled rather than walked in full.
//!
//! Estimation is allowed to give up: returning `None` makes the cache fall
//! back to [`DEFAULT_SIZE_ESTIMATE`] and log a warning, never fail the insert.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;

/// Fallback size in bytes when no estimate is possible.
pub const DEFAULT_SIZE_ESTIMATE: usize = 100;

/// Approximate size of a scalar value in bytes.
const SCALAR_SIZE: usize = 8;

/// Collections larger than this are sampled instead of summed exactly.
const SAMPLE_THRESHOLD: usize = 10;

/// Best-effort size estimation for cached values.
///
/// Implementations return an approximate byte count, or `None` when the type
/// cannot offer one. The cache treats `None` as a recoverable condition.
///
/// # Example
///
/// ```
/// use selective_cache::{EstimateSize, estimate_serialized};
///
/// #[derive(serde::Serialize)]
/// struct ModelOutput {
///     text: String,
///     confidence: f64,
/// }
///
/// impl EstimateSize for ModelOutput {
///     fn estimate_size(&self) -> Option<usize> {
///         // Serialized length is a fine approximation for small payloads.
///         estimate_serialized(self)
///     }
/// }
/// ```
pub trait EstimateSize {
	/// Approximate size of this value in bytes, or `None` if unknown.
	fn estimate_size(&self) -> Option<usize>;
}

/// Estimate a value's size as the length of its JSON serialization.
///
/// Returns `None` if serialization fails; the cache will then fall back to
/// [`DEFAULT_SIZE_ESTIMATE`].
pub fn estimate_serialized<T: Serialize>(value: &T) -> Option<usize> {
	serde_json::to_vec(value).ok().map(|bytes| bytes.len())
}

/// Estimate a collection from per-element sizes.
///
/// Small collections are summed exactly. Above [`SAMPLE_THRESHOLD`] elements,
/// the first `SAMPLE_THRESHOLD` are averaged and scaled by the total count.
/// Any element without an estimate makes the whole collection unestimable.
fn estimate_elements(len: usize, sizes: impl Iterator<Item = Option<usize>>) -> Option<usize> {
	if len <= SAMPLE_THRESHOLD {
		let mut total = 0usize;
		for size in sizes {
			total = total.saturating_add(size?);
		}
		Some(total)
	} else {
		let mut sampled = 0usize;
		for size in sizes.take(SAMPLE_THRESHOLD) {
			sampled = sampled.saturating_add(size?);
		}
		Some(sampled.saturating_mul(len) / SAMPLE_THRESHOLD)
	}
}

macro_rules! scalar_estimate {
	($($ty:ty),* $(,)?) => {
		$(
			impl EstimateSize for $ty {
				fn estimate_size(&self) -> Option<usize> {
					Some(SCALAR_SIZE)
				}
			}
		)*
	};
}

scalar_estimate!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char, ());

impl EstimateSize for String {
	fn estimate_size(&self) -> Option<usize> {
		Some(self.len().saturating_mul(2))
	}
}

impl EstimateSize for &str {
	fn estimate_size(&self) -> Option<usize> {
		Some(self.len().saturating_mul(2))
	}
}

impl<T: EstimateSize> EstimateSize for Option<T> {
	fn estimate_size(&self) -> Option<usize> {
		match self {
			Some(inner) => inner.estimate_size(),
			None => Some(SCALAR_SIZE),
		}
	}
}

impl<T: EstimateSize> EstimateSize for Vec<T> {
	fn estimate_size(&self) -> Option<usize> {
		estimate_elements(self.len(), self.iter().map(EstimateSize::estimate_size))
	}
}

impl<T: EstimateSize> EstimateSize for VecDeque<T> {
	fn estimate_size(&self) -> Option<usize> {
		estimate_elements(self.len(), self.iter().map(EstimateSize::estimate_size))
	}
}

impl<T: EstimateSize> EstimateSize for HashSet<T> {
	fn estimate_size(&self) -> Option<usize> {
		estimate_elements(self.len(), self.iter().map(EstimateSize::estimate_size))
	}
}

impl<T: EstimateSize> EstimateSize for BTreeSet<T> {
	fn estimate_size(&self) -> Option<usize> {
		estimate_elements(self.len(), self.iter().map(EstimateSize::estimate_size))
	}
}

impl<K: EstimateSize, V: EstimateSize> EstimateSize for HashMap<K, V> {
	fn estimate_size(&self) -> Option<usize> {
		estimate_elements(
			self.len(),
			self.iter().map(|(k, v)| Some(k.estimate_size()?.saturating_add(v.estimate_size()?))),
		)
	}
}

impl<K: EstimateSize, V: EstimateSize> EstimateSize for BTreeMap<K, V> {
	fn estimate_size(&self) -> Option<usize> {
		estimate_elements(
			self.len(),
			self.iter().map(|(k, v)| Some(k.estimate_size()?.saturating_add(v.estimate_size()?))),
		)
	}
}

impl<T: EstimateSize + ?Sized> EstimateSize for Box<T> {
	fn estimate_size(&self) -> Option<usize> {
		(**self).estimate_size()
	}
}

impl<T: EstimateSize + ?Sized> EstimateSize for Arc<T> {
	fn estimate_size(&self) -> Option<usize> {
		(**self).estimate_size()
	}
}

impl<T: EstimateSize + ?Sized> EstimateSize for Rc<T> {
	fn estimate_size(&self) -> Option<usize> {
		(**self).estimate_size()
	}
}

impl EstimateSize for serde_json::Value {
	fn estimate_size(&self) -> Option<usize> {
		estimate_serialized(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_scalar_sizes() {
		assert_eq!(42u64.estimate_size(), Some(8));
		assert_eq!(1.5f64.estimate_size(), Some(8));
		assert_eq!(true.estimate_size(), Some(8));
		assert_eq!('x'.estimate_size(), Some(8));
	}

	#[test]
	fn test_string_size() {
		assert_eq!("hello".to_string().estimate_size(), Some(10));
		assert_eq!("".to_string().estimate_size(), Some(0));
	}

	#[test]
	fn test_small_collection_summed_exactly() {
		let values: Vec<u64> = (0..5).collect();
		assert_eq!(values.estimate_size(), Some(5 * 8));
	}

	#[test]
	fn test_large_collection_sampled() {
		// 100 strings of 10 bytes each: sample average is 20, scaled by count.
		let values: Vec<String> = (0..100).map(|_| "x".repeat(10)).collect();
		assert_eq!(values.estimate_size(), Some(20 * 100));
	}

	#[test]
	fn test_sampling_uses_average_not_sum() {
		// First 10 elements are small, the rest large: the estimate reflects
		// the sample, not the true total.
		let mut values: Vec<String> = (0..10).map(|_| "ab".to_string()).collect();
		values.extend((0..90).map(|_| "x".repeat(1000)));
		assert_eq!(values.estimate_size(), Some(4 * 100));
	}

	#[test]
	fn test_map_counts_keys_and_values() {
		let mut map = BTreeMap::new();
		map.insert("key".to_string(), 1u64);
		assert_eq!(map.estimate_size(), Some(6 + 8));
	}

	#[test]
	fn test_option_and_indirection() {
		assert_eq!(None::<u64>.estimate_size(), Some(8));
		assert_eq!(Some(7u64).estimate_size(), Some(8));
		assert_eq!(Box::new("abc".to_string()).estimate_size(), Some(6));
		assert_eq!(Arc::new(3u32).estimate_size(), Some(8));
	}

	#[test]
	fn test_serialized_fallback() {
		let value = serde_json::json!({"a": 1, "b": [1, 2, 3]});
		let estimate = value.estimate_size().unwrap();
		assert!(estimate > 0);
		assert_eq!(Some(estimate), estimate_serialized(&value));
	}
}
