//! Iterators for the `BTree` data structure
//!
//! An iterator captures the root `Arc` and the tree's modification counter
//! when it is created. From then on it walks that snapshot lazily, one key
//! per advance, without taking the tree lock: nodes are copy-on-write, so
//! later writers copy any node the snapshot still references instead of
//! changing it underneath the iterator.
//!
//! ```text
//!   stack (top last)                 yields
//!   ─────────────────────────────    ──────
//!   ([2 4], 0) ([1], 0)               1
//!   ([2 4], 1) ([3], 0)               2, 3
//!   ([2 4], 2) ([5 6 7], 0)           4, 5, 6, 7
//! ```
//!
//! Advancing re-reads the live counter and fails with
//! [`Error::ConcurrentModification`] once anything other than this
//! iterator's own [`remove`](Iter::remove) has modified the tree.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::node::{Edge, Node};
use crate::BTree;

/// Iterator over keys in ascending order.
pub type Keys<'t, K, V> = Iter<'t, K, V, K>;

/// Iterator over values in ascending key order.
pub type Values<'t, K, V> = Iter<'t, K, V, V>;

/// Iterator over `(key, value)` pairs in ascending key order.
pub type Entries<'t, K, V> = Iter<'t, K, V, (K, V)>;

/// A fail-fast, snapshot-based iterator over a [`BTree`].
///
/// `T` is what each advance produces: a key, a value or an entry, see
/// [`Keys`], [`Values`] and [`Entries`]. The iterator is finite and not
/// restartable; ask the tree for a fresh one to iterate again.
pub struct Iter<'t, K, V, T> {
	tree: &'t BTree<K, V>,
	/// Modification count this iterator is in sync with.
	expected: usize,
	/// In-order traversal frames: a node and the index of the next key to
	/// yield from it. Every frame below the top has already had its child at
	/// that index fully descended.
	stack: Vec<(Edge<K, V>, usize)>,
	/// Key produced by the last advance, cleared by `remove`.
	last: Option<K>,
	project: fn(&K, &V) -> T,
	/// Set once the `Iterator` impl has reported an error or run out.
	fused: bool,
}

impl<'t, K: Clone, V: Clone, T> Iter<'t, K, V, T> {
	pub(crate) fn new(tree: &'t BTree<K, V>, project: fn(&K, &V) -> T) -> Self {
		let (root, expected) = tree.snapshot();
		let mut iter = Iter {
			tree,
			expected,
			stack: Vec::new(),
			last: None,
			project,
			fused: false,
		};
		iter.descend(root);
		iter
	}

	/// Pushes `node` and its leftmost descendants.
	fn descend(&mut self, mut node: Edge<K, V>) {
		loop {
			let child = (!node.leaf).then(|| Arc::clone(&node.children[0]));
			self.stack.push((node, 0));
			match child {
				Some(child) => node = child,
				None => return,
			}
		}
	}

	fn check_for_comodification(&self) -> Result<()> {
		if self.tree.modifications() != self.expected {
			return Err(Error::ConcurrentModification);
		}
		Ok(())
	}

	/// Returns `true` if another advance would produce an item.
	///
	/// Fails with [`Error::ConcurrentModification`] if the tree was modified
	/// behind the iterator's back.
	pub fn has_next(&self) -> Result<bool> {
		self.check_for_comodification()?;
		Ok(self.stack.iter().any(|(node, pos)| *pos < node.len()))
	}

	/// Advances the iterator.
	///
	/// Returns `Ok(None)` once the snapshot is exhausted, and fails with
	/// [`Error::ConcurrentModification`] (every time it is called) once the
	/// tree was modified behind the iterator's back.
	pub fn next_entry(&mut self) -> Result<Option<T>> {
		self.check_for_comodification()?;

		loop {
			let Some((node, pos)) = self.stack.last_mut() else {
				return Ok(None);
			};
			if *pos == node.len() {
				self.stack.pop();
				continue;
			}

			let index = *pos;
			*pos += 1;
			let node: &Node<K, V> = node;
			let item = (self.project)(&node.keys[index], &node.values[index]);
			let key = node.keys[index].clone();
			let next_child = (!node.leaf).then(|| Arc::clone(&node.children[index + 1]));

			if let Some(child) = next_child {
				self.descend(child);
			}
			self.last = Some(key);
			return Ok(Some(item));
		}
	}

	/// Deletes the entry produced by the last advance from the tree.
	///
	/// Goes through the same write lock as [`BTree::delete`], then
	/// re-synchronises the iterator with the tree's modification counter, so
	/// iteration can continue. Fails with [`Error::InvalidIteratorState`]
	/// before the first advance or when called twice in a row, and with
	/// [`Error::ConcurrentModification`] if the tree was modified behind the
	/// iterator's back.
	pub fn remove(&mut self) -> Result<()> {
		let key = self.last.as_ref().ok_or(Error::InvalidIteratorState)?;
		self.expected = self.tree.remove_tracked(key, self.expected)?;
		self.last = None;
		Ok(())
	}
}

impl<K: Clone, V: Clone, T> Iterator for Iter<'_, K, V, T> {
	type Item = Result<T>;

	/// Yields the next item, or a single `Err`. The iterator is fused after
	/// an error and after it runs out.
	fn next(&mut self) -> Option<Self::Item> {
		if self.fused {
			return None;
		}
		match self.next_entry() {
			Ok(Some(item)) => Some(Ok(item)),
			Ok(None) => {
				self.fused = true;
				None
			}
			Err(err) => {
				self.fused = true;
				Some(Err(err))
			}
		}
	}
}

impl<K, V, T> fmt::Debug for Iter<'_, K, V, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Iter")
			.field("expected", &self.expected)
			.field("depth", &self.stack.len())
			.field("can_remove", &self.last.is_some())
			.finish()
	}
}
