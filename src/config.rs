//! Tree configuration.
//!
//! The only tunable is the minimum degree `t`, which bounds every node to
//! at most `2t - 1` keys and `2t` children, and every non-root node to at
//! least `t - 1` keys. The degree is fixed when the tree is built.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minimum degree used by [`BTree::new`](crate::BTree::new).
///
/// Gives 11 keys and 12 children per full node, which keeps the inline
/// node storage within a couple of cache lines for small keys.
pub const DEFAULT_MIN_DEGREE: usize = 6;

/// Configuration for a [`BTree`](crate::BTree).
///
/// Deserialisable so it can be embedded in a larger application config:
///
/// ```
/// let config: spruce::Config = serde_json::from_str(r#"{ "min_degree": 3 }"#).unwrap();
/// assert_eq!(config.max_keys(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Minimum degree `t`. Must be at least 2.
	pub min_degree: usize,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			min_degree: DEFAULT_MIN_DEGREE,
		}
	}
}

impl Config {
	/// Creates a configuration with the given minimum degree.
	pub fn new(min_degree: usize) -> Self {
		Config {
			min_degree,
		}
	}

	/// Checks that the degree can form a valid tree.
	///
	/// The degree must be at least 2, and `2t` children must be countable
	/// in a `usize`.
	pub fn validate(&self) -> Result<()> {
		if self.min_degree < 2 {
			return Err(Error::InvalidArgument("minimum degree must be at least 2"));
		}
		if self.min_degree.checked_mul(2).is_none() {
			return Err(Error::InvalidArgument("minimum degree is too large"));
		}
		Ok(())
	}

	/// Maximum number of keys a node may hold (`2t - 1`).
	///
	/// Saturates instead of overflowing for a config that has not passed
	/// [`validate`](Self::validate).
	pub fn max_keys(&self) -> usize {
		self.max_children().saturating_sub(1)
	}

	/// Maximum number of children an internal node may hold (`2t`).
	pub fn max_children(&self) -> usize {
		self.min_degree.saturating_mul(2)
	}

	/// Minimum number of keys a non-root node must hold (`t - 1`).
	pub fn min_keys(&self) -> usize {
		self.min_degree.saturating_sub(1)
	}
}
