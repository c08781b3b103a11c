use thiserror::Error;

/// Errors surfaced by the cache.
///
/// The cache is a best-effort layer: lookups and insertions never fail with an
/// error (a rejected admission is a plain `false`). The only fallible surfaces
/// are malformed invalidation patterns and configuration.
#[derive(Debug, Error)]
pub enum CacheError {
	/// The pattern passed to `invalidate_by_pattern` did not compile.
	#[error("invalid invalidation pattern: {0}")]
	InvalidPattern(#[from] regex::Error),

	/// An unsupported policy kind was requested at construction time.
	#[error("unknown cache policy kind: {0:?}")]
	UnknownPolicy(String),
}
