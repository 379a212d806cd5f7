//! # Spruce: An In-Memory B-tree
//!
//! This crate provides a classic B-tree of minimum degree `t`: every node
//! holds between `t - 1` and `2t - 1` ordered keys (the root may hold fewer),
//! keys live in internal nodes as well as leaves, and all leaves sit at the
//! same depth. Search, insertion and deletion run in `O(t log_t n)`.
//!
//! ## Design Overview
//!
//! **Single-pass restructuring**: insertion splits full nodes on the way
//! down, and deletion tops up minimal nodes on the way down (by borrowing
//! from a sibling or merging with one). Neither ever walks back up, so no
//! parent pointers are stored.
//!
//! **Copy-on-write nodes**: children are held in `Arc`s and mutated through
//! `Arc::make_mut`. An iterator captures the root `Arc` when it is created
//! and then reads a point-in-time snapshot without holding any lock; the
//! first write to a node it still references copies that node.
//!
//! **Fail-fast iteration**: the tree counts structural modifications.
//! Iterators remember the count they started from and refuse to advance
//! once it has moved, unless the change came from the iterator's own
//! [`remove`](iter::Iter::remove).
//!
//! ### Tree Structure
//!
//! ```text
//!                    ┌─────────────────┐
//!                    │  RwLock<RawTree> │  <- one lock for the whole tree
//!                    │  modifications   │  <- AtomicUsize, bumped by writers
//!                    └────────┬────────┘
//!                             │
//!                             ▼
//!                    ┌─────────────────┐
//!                    │   Root Node     │  <- 1 ..= 2t-1 keys, values inline
//!                    │  keys / values  │
//!                    │  children: Arc  │
//!                    └────────┬────────┘
//!              ┌──────────────┼──────────────┐
//!              ▼              ▼              ▼
//!        ┌──────────┐  ┌──────────┐  ┌──────────┐
//!        │   Leaf   │  │   Leaf   │  │   Leaf   │  <- all at the same depth
//!        └──────────┘  └──────────┘  └──────────┘
//! ```
//!
//! ## Basic Usage
//!
//! ```
//! use spruce::BTree;
//!
//! let tree = BTree::with_degree(2).unwrap();
//!
//! tree.insert(1, "one").unwrap();
//! tree.insert(2, "two").unwrap();
//! assert!(tree.insert(2, "deux").is_err()); // duplicates are rejected
//!
//! assert_eq!(tree.get(&1), Some("one"));
//! assert_eq!(tree.successor(&1).unwrap(), Some(2));
//!
//! let keys: Vec<i32> = tree.keys().collect::<Result<_, _>>().unwrap();
//! assert_eq!(keys, vec![1, 2]);
//!
//! tree.delete(&1).unwrap();
//! assert_eq!(tree.len(), 1);
//! ```
//!
//! ## Thread Safety
//!
//! All methods take `&self`. Writers serialise on a single
//! `parking_lot::RwLock`; splits and merges may touch every ancestor of a
//! leaf, so there is no per-node locking. Share the tree across threads
//! with `Arc<BTree<K, V>>`.

use parking_lot::RwLock;

use std::cmp::Ordering as KeyOrdering;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

mod blank;
pub mod config;
pub mod error;
pub mod iter;
mod node;
mod tree;
#[cfg(test)]
mod util;

pub use blank::Blank;
pub use config::{Config, DEFAULT_MIN_DEGREE};
pub use error::{Error, Result};
pub use iter::{Entries, Iter, Keys, Values};
pub use node::NodeRef;

use node::Edge;
use tree::RawTree;

// ---------------------------------------------------------------------------
// Core Tree Structure
// ---------------------------------------------------------------------------

/// An in-memory B-tree mapping keys to values.
///
/// # Type Parameters
///
/// - `K`: The key type. Ordered by the comparator given at construction,
///   which defaults to `Ord::cmp`. Must be `Clone` so nodes can be copied
///   on write and keys can be handed out by value.
/// - `V`: The value type. Must be `Clone` for the same reasons.
///
/// # Internal Structure
///
/// - A `RwLock` around the raw tree: root pointer, minimum degree,
///   comparator and entry count.
/// - A modification counter, readable without the lock, that iterators use
///   to detect structural changes made behind their back.
pub struct BTree<K, V> {
	/// The tree itself. Readers share the lock, writers hold it exclusively.
	raw: RwLock<RawTree<K, V>>,

	/// Structural modification counter.
	///
	/// Only bumped while the write lock is held, so a value read under the
	/// read lock is consistent with the root read alongside it.
	modifications: AtomicUsize,
}

impl<K: Ord + Clone, V: Clone> Default for BTree<K, V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K: Ord, V> BTree<K, V> {
	/// Creates an empty tree with [`DEFAULT_MIN_DEGREE`] ordered by `Ord`.
	///
	/// # Example
	///
	/// ```
	/// use spruce::BTree;
	///
	/// let tree: BTree<i32, String> = BTree::new();
	/// assert!(tree.is_empty());
	/// assert_eq!(tree.min_degree(), spruce::DEFAULT_MIN_DEGREE);
	/// ```
	pub fn new() -> Self {
		Self::from_raw(RawTree::new(DEFAULT_MIN_DEGREE, <K as Ord>::cmp))
	}

	/// Creates an empty tree with minimum degree `t`.
	///
	/// Fails with [`Error::InvalidArgument`] when `t < 2`.
	pub fn with_degree(t: usize) -> Result<Self> {
		Self::with_comparator(t, <K as Ord>::cmp)
	}

	/// Creates an empty tree from a [`Config`].
	pub fn from_config(config: &Config) -> Result<Self> {
		Self::with_degree(config.min_degree)
	}
}

impl<K, V> BTree<K, V> {
	/// Creates an empty tree with minimum degree `t` whose keys are ordered
	/// by `cmp` instead of `Ord`.
	///
	/// # Example
	///
	/// ```
	/// use spruce::BTree;
	///
	/// let tree = BTree::with_comparator(2, |a: &i32, b: &i32| b.cmp(a)).unwrap();
	/// for k in 1..=5 {
	///     tree.insert(k, k).unwrap();
	/// }
	/// assert_eq!(tree.minimum(), Some((5, 5)));
	/// ```
	pub fn with_comparator(t: usize, cmp: fn(&K, &K) -> KeyOrdering) -> Result<Self> {
		Config::new(t).validate()?;
		Ok(Self::from_raw(RawTree::new(t, cmp)))
	}

	pub(crate) fn from_raw(raw: RawTree<K, V>) -> Self {
		BTree {
			raw: RwLock::new(raw),
			modifications: AtomicUsize::new(0),
		}
	}

	/// Returns the number of entries. O(1).
	pub fn len(&self) -> usize {
		self.raw.read().len
	}

	/// Returns `true` if the tree contains no entries.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns the minimum degree `t` the tree was built with.
	pub fn min_degree(&self) -> usize {
		self.raw.read().degree
	}

	/// Returns the number of levels. A tree whose root is a leaf has height 1.
	pub fn height(&self) -> usize {
		self.raw.read().height()
	}

	/// Returns the structural modification counter.
	///
	/// The counter increases on every insert, delete, iterator removal and
	/// clear. Its absolute value carries no meaning.
	pub fn modifications(&self) -> usize {
		self.modifications.load(Ordering::Acquire)
	}

	/// Visits every node in post-order, root last.
	///
	/// Holds the read lock for the duration of the walk. Intended for
	/// diagnostics and serialisation; see [`NodeRef`] for what a visitor can
	/// inspect.
	///
	/// # Example
	///
	/// ```
	/// use spruce::BTree;
	///
	/// let tree = BTree::with_degree(2).unwrap();
	/// for k in 1..=4 {
	///     tree.insert(k, ()).unwrap();
	/// }
	///
	/// let mut nodes = Vec::new();
	/// tree.walk(|node| nodes.push(node.keys().to_vec()));
	/// assert_eq!(nodes, vec![vec![1], vec![3, 4], vec![2]]);
	/// ```
	pub fn walk<F>(&self, mut visitor: F)
	where
		F: FnMut(NodeRef<'_, K, V>),
	{
		self.raw.read().walk(&mut visitor);
	}

	/// Captures the root and the modification counter as one consistent pair.
	pub(crate) fn snapshot(&self) -> (Edge<K, V>, usize) {
		let raw = self.raw.read();
		(Arc::clone(&raw.root), self.modifications.load(Ordering::Acquire))
	}

	#[inline]
	fn bump(&self) -> usize {
		self.modifications.fetch_add(1, Ordering::AcqRel) + 1
	}
}

impl<K: Clone, V: Clone> BTree<K, V> {
	// -----------------------------------------------------------------------
	// Lookups
	// -----------------------------------------------------------------------

	/// Returns a clone of the value stored under `key`.
	///
	/// # Example
	///
	/// ```
	/// use spruce::BTree;
	///
	/// let tree: BTree<i32, String> = BTree::new();
	/// tree.insert(1, "one".to_string()).unwrap();
	///
	/// assert_eq!(tree.get(&1), Some("one".to_string()));
	/// assert_eq!(tree.get(&2), None);
	/// ```
	pub fn get(&self, key: &K) -> Option<V> {
		self.raw.read().get(key).cloned()
	}

	/// Returns `true` if the tree contains `key`.
	pub fn contains_key(&self, key: &K) -> bool {
		self.raw.read().search(key).is_some()
	}

	/// Returns the entry with the smallest key, or `None` if the tree is empty.
	pub fn minimum(&self) -> Option<(K, V)> {
		self.raw.read().minimum().map(|(k, v)| (k.clone(), v.clone()))
	}

	/// Returns the entry with the largest key, or `None` if the tree is empty.
	pub fn maximum(&self) -> Option<(K, V)> {
		self.raw.read().maximum().map(|(k, v)| (k.clone(), v.clone()))
	}

	/// Returns the largest key strictly less than `key`.
	///
	/// `key` does not have to be present. Returns `Ok(None)` when nothing
	/// smaller is stored, and fails with [`Error::InvalidArgument`] for a
	/// blank key.
	///
	/// # Example
	///
	/// ```
	/// use spruce::BTree;
	///
	/// let tree = BTree::with_degree(2).unwrap();
	/// for k in [10, 20, 30] {
	///     tree.insert(k, ()).unwrap();
	/// }
	///
	/// assert_eq!(tree.predecessor(&20).unwrap(), Some(10));
	/// assert_eq!(tree.predecessor(&25).unwrap(), Some(20));
	/// assert_eq!(tree.predecessor(&10).unwrap(), None);
	/// ```
	pub fn predecessor(&self, key: &K) -> Result<Option<K>>
	where
		K: Blank,
	{
		if key.is_blank() {
			return Err(Error::InvalidArgument("key must not be blank"));
		}
		Ok(self.raw.read().predecessor(key).cloned())
	}

	/// Returns the smallest key strictly greater than `key`.
	///
	/// The mirror image of [`predecessor`](Self::predecessor).
	pub fn successor(&self, key: &K) -> Result<Option<K>>
	where
		K: Blank,
	{
		if key.is_blank() {
			return Err(Error::InvalidArgument("key must not be blank"));
		}
		Ok(self.raw.read().successor(key).cloned())
	}

	// -----------------------------------------------------------------------
	// Mutations
	// -----------------------------------------------------------------------

	/// Inserts a new entry.
	///
	/// Fails with [`Error::InvalidArgument`] if the key or value is blank and
	/// with [`Error::DuplicateKey`] if the key is already present; in both
	/// cases the tree is left untouched.
	///
	/// # Example
	///
	/// ```
	/// use spruce::{BTree, Error};
	///
	/// let tree: BTree<String, u32> = BTree::new();
	///
	/// tree.insert("a".to_string(), 1).unwrap();
	/// assert_eq!(tree.insert("a".to_string(), 2), Err(Error::DuplicateKey));
	/// assert!(tree.insert(String::new(), 3).unwrap_err().is_invalid_argument());
	/// assert_eq!(tree.get(&"a".to_string()), Some(1));
	/// ```
	pub fn insert(&self, key: K, value: V) -> Result<()>
	where
		K: Blank,
		V: Blank,
	{
		if key.is_blank() {
			return Err(Error::InvalidArgument("key must not be blank"));
		}
		if value.is_blank() {
			return Err(Error::InvalidArgument("value must not be blank"));
		}

		let mut raw = self.raw.write();
		if raw.search(&key).is_some() {
			return Err(Error::DuplicateKey);
		}
		raw.insert(key, value);
		self.bump();
		Ok(())
	}

	/// Deletes `key` from the tree.
	///
	/// Fails with [`Error::EmptyCollection`] if the tree holds no entries.
	/// Deleting a key that is absent from a non-empty tree is a no-op and
	/// returns `Ok(())`; use [`contains_key`](Self::contains_key) first, or
	/// [`remove`](Self::remove), to learn whether anything was deleted.
	///
	/// # Example
	///
	/// ```
	/// use spruce::{BTree, Error};
	///
	/// let tree: BTree<i32, i32> = BTree::new();
	/// assert_eq!(tree.delete(&1), Err(Error::EmptyCollection));
	///
	/// tree.insert(1, 10).unwrap();
	/// assert_eq!(tree.delete(&2), Ok(()));
	/// assert_eq!(tree.delete(&1), Ok(()));
	/// assert!(tree.is_empty());
	/// ```
	pub fn delete(&self, key: &K) -> Result<()> {
		let mut raw = self.raw.write();
		if raw.len == 0 {
			return Err(Error::EmptyCollection);
		}
		raw.remove(key);
		self.bump();
		Ok(())
	}

	/// Removes `key` and returns its value, or `None` if it was absent.
	///
	/// Unlike [`delete`](Self::delete) this never fails, including on an
	/// empty tree.
	pub fn remove(&self, key: &K) -> Option<V> {
		let mut raw = self.raw.write();
		if raw.len == 0 {
			return None;
		}
		let removed = raw.remove(key);
		self.bump();
		removed
	}

	/// Removes `key` on behalf of an iterator that last saw the counter at
	/// `expected`, returning the counter value after the removal.
	pub(crate) fn remove_tracked(&self, key: &K, expected: usize) -> Result<usize> {
		let mut raw = self.raw.write();
		if self.modifications.load(Ordering::Acquire) != expected {
			return Err(Error::ConcurrentModification);
		}
		raw.remove(key);
		Ok(self.bump())
	}

	/// Removes all entries, leaving an empty tree of height 1.
	pub fn clear(&self) {
		let mut raw = self.raw.write();
		let dropped = raw.len;
		raw.clear();
		self.bump();
		debug!(entries = dropped, "tree cleared");
	}

	// -----------------------------------------------------------------------
	// Iteration
	// -----------------------------------------------------------------------

	/// Returns an iterator over the keys in ascending order.
	///
	/// Each item is a `Result`: advancing after the tree was modified by
	/// anything other than this iterator yields
	/// [`Error::ConcurrentModification`].
	pub fn keys(&self) -> Keys<'_, K, V> {
		Iter::new(self, |k, _| k.clone())
	}

	/// Returns an iterator over the values in ascending key order.
	pub fn values(&self) -> Values<'_, K, V> {
		Iter::new(self, |_, v| v.clone())
	}

	/// Returns an iterator over `(key, value)` pairs in ascending key order.
	///
	/// # Example
	///
	/// ```
	/// use spruce::BTree;
	///
	/// let tree = BTree::with_degree(2).unwrap();
	/// for k in 1..=5 {
	///     tree.insert(k, k * 10).unwrap();
	/// }
	///
	/// // Remove the even keys while iterating.
	/// let mut entries = tree.entries();
	/// while let Some((k, _)) = entries.next_entry().unwrap() {
	///     if k % 2 == 0 {
	///         entries.remove().unwrap();
	///     }
	/// }
	///
	/// let keys: Vec<i32> = tree.keys().map(Result::unwrap).collect();
	/// assert_eq!(keys, vec![1, 3, 5]);
	/// ```
	pub fn entries(&self) -> Entries<'_, K, V> {
		Iter::new(self, |k, v| (k.clone(), v.clone()))
	}

	/// Alias for [`entries`](Self::entries).
	pub fn iter(&self) -> Entries<'_, K, V> {
		self.entries()
	}
}

// ===========================================================================
// Validation
// ===========================================================================

impl<K: fmt::Debug, V> BTree<K, V> {
	/// Validates all tree invariants. Panics with diagnostic info if any
	/// invariant is violated.
	///
	/// # Invariants Checked
	///
	/// 1. Keys strictly ascending within each node and across subtrees
	/// 2. Every internal node has one more child than it has keys
	/// 3. All leaves at the same depth
	/// 4. Non-root nodes hold between `t - 1` and `2t - 1` keys
	/// 5. An empty root is a leaf
	/// 6. The entry counter matches the number of stored keys
	pub fn assert_invariants(&self) {
		self.raw.read().assert_invariants();
	}
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BTree<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let raw = self.raw.read();
		let mut map = f.debug_map();
		raw.for_each_entry(&mut |k, v| {
			map.entry(k, v);
		});
		map.finish()
	}
}
