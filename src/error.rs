//! # Error Types for the B-tree
//!
//! Every fallible operation on [`BTree`](crate::BTree) and its iterators
//! reports one of the variants below. All of them describe caller errors:
//! validation always happens before any node is touched, so a returned
//! error means the tree is exactly as it was before the call.
//!
//! ## Taxonomy
//!
//! ```text
//! InvalidArgument ──┬── blank key or value, degree below 2
//!                   └── DuplicateKey (insert-time collision)
//! EmptyCollection ───── delete() on a tree with no entries
//! ConcurrentModification ── iterator advanced after a foreign mutation
//! InvalidIteratorState ──── iterator remove() without a fresh advance
//! ```

use thiserror::Error;

/// Errors returned by tree and iterator operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
	/// An argument was rejected before any mutation took place.
	///
	/// Raised for blank keys or values (see [`Blank`](crate::Blank)) and
	/// for a minimum degree below 2.
	#[error("invalid argument: {0}")]
	InvalidArgument(&'static str),

	/// The key passed to `insert` is already stored in the tree.
	///
	/// Duplicate keys are rejected, never overwritten. Callers that want
	/// upsert semantics can match on this variant and fall back to a
	/// delete-then-insert.
	#[error("invalid argument: key already present")]
	DuplicateKey,

	/// `delete` was called on a tree that holds no entries.
	#[error("collection is empty")]
	EmptyCollection,

	/// The tree was structurally modified after the iterator captured its
	/// modification counter, by a path other than the iterator's own
	/// `remove`.
	#[error("tree was modified during iteration")]
	ConcurrentModification,

	/// Iterator `remove` was called before the first advance, or twice
	/// without an advance in between.
	#[error("remove called without a preceding advance")]
	InvalidIteratorState,
}

impl Error {
	/// Returns `true` for argument errors, including [`Error::DuplicateKey`].
	pub fn is_invalid_argument(&self) -> bool {
		matches!(self, Error::InvalidArgument(_) | Error::DuplicateKey)
	}
}

/// A Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
