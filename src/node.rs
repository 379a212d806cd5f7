//! # B-tree Nodes
//!
//! A node stores up to `2t - 1` ordered keys, their values in a parallel
//! array, and (for internal nodes) up to `2t` children. The arrays are
//! kept truncated to exactly the occupied length, so there is no notion of
//! an "empty slot".
//!
//! ```text
//!            keys:      [ k0 | k1 | k2 ]
//!            values:    [ v0 | v1 | v2 ]
//!            children: [c0 | c1 | c2 | c3]
//!
//!   c0 < k0 < c1 < k1 < c2 < k2 < c3
//! ```
//!
//! Children are reference counted and mutated with `Arc::make_mut`. While
//! no iterator snapshot holds a node, `make_mut` is a plain mutable borrow;
//! while one does, the node is copied on first write and the snapshot keeps
//! the old version.
//!
//! The primitives here never check tree-level invariants. The tree module
//! is responsible for only calling them when the result is valid.

use smallvec::SmallVec;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Keys and values stored inline before spilling to the heap.
/// Matches a full node at the default minimum degree.
pub(crate) const KEY_INLINE: usize = 11;

/// Child pointers stored inline before spilling to the heap.
pub(crate) const EDGE_INLINE: usize = KEY_INLINE + 1;

/// Comparison function used to order keys.
pub(crate) type Comparator<K> = fn(&K, &K) -> Ordering;

/// Reference-counted child pointer.
pub(crate) type Edge<K, V> = Arc<Node<K, V>>;

/// A single B-tree node.
#[derive(Clone)]
pub(crate) struct Node<K, V> {
	/// Ordered keys, exactly `len()` of them.
	pub(crate) keys: SmallVec<[K; KEY_INLINE]>,
	/// Values parallel to `keys`.
	pub(crate) values: SmallVec<[V; KEY_INLINE]>,
	/// Children, `len() + 1` of them for internal nodes, none for leaves.
	pub(crate) children: SmallVec<[Edge<K, V>; EDGE_INLINE]>,
	/// True iff the node has no children.
	pub(crate) leaf: bool,
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Node<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Node")
			.field("leaf", &self.leaf)
			.field("keys", &self.keys)
			.field("values", &self.values)
			.field("children", &self.children)
			.finish()
	}
}

impl<K, V> Node<K, V> {
	/// Creates an empty node. Storage grows on demand, so a large degree
	/// costs nothing until the node fills up.
	pub(crate) fn new(leaf: bool) -> Self {
		Node {
			keys: SmallVec::new(),
			values: SmallVec::new(),
			children: SmallVec::new(),
			leaf,
		}
	}

	/// Number of occupied key slots.
	#[inline]
	pub(crate) fn len(&self) -> usize {
		self.keys.len()
	}

	/// A node is full when it holds `2t - 1` keys.
	#[inline]
	pub(crate) fn is_full(&self, degree: usize) -> bool {
		self.keys.len() == 2 * degree - 1
	}

	/// Finds the first key not less than `key`.
	///
	/// Returns `(position, exact_match)`. When `exact_match` is false,
	/// `position` is both the insertion slot and the index of the child
	/// whose subtree would contain `key`.
	#[inline]
	pub(crate) fn lower_bound(&self, key: &K, cmp: Comparator<K>) -> (usize, bool) {
		match self.keys.binary_search_by(|probe| cmp(probe, key)) {
			Ok(pos) => (pos, true),
			Err(pos) => (pos, false),
		}
	}

	/// Shifts the entries at and after `pos` one slot right and writes the
	/// new entry into the gap.
	pub(crate) fn insert_entry(&mut self, pos: usize, key: K, value: V) {
		self.keys.insert(pos, key);
		self.values.insert(pos, value);
	}

	/// Removes the entry at `pos`, shifting the remainder left.
	pub(crate) fn remove_entry(&mut self, pos: usize) -> (K, V) {
		(self.keys.remove(pos), self.values.remove(pos))
	}

	/// Moves the entries from `at` onwards, and the children from `at`
	/// onwards, into a new sibling. The node keeps everything before `at`.
	pub(crate) fn split_off(&mut self, at: usize) -> Node<K, V> {
		let children = if self.leaf {
			SmallVec::new()
		} else {
			self.children.drain(at..).collect()
		};
		Node {
			keys: self.keys.drain(at..).collect(),
			values: self.values.drain(at..).collect(),
			children,
			leaf: self.leaf,
		}
	}

	/// Removes the last entry together with the last child, if any.
	pub(crate) fn pop_last(&mut self) -> Option<(K, V, Option<Edge<K, V>>)> {
		let key = self.keys.pop()?;
		let value = self.values.pop()?;
		let edge = if self.leaf {
			None
		} else {
			self.children.pop()
		};
		Some((key, value, edge))
	}

	/// Removes the first entry together with the first child, if any.
	pub(crate) fn pop_first(&mut self) -> Option<(K, V, Option<Edge<K, V>>)> {
		if self.keys.is_empty() {
			return None;
		}
		let (key, value) = self.remove_entry(0);
		let edge = if self.leaf {
			None
		} else {
			Some(self.children.remove(0))
		};
		Some((key, value, edge))
	}

	/// Prepends an entry and, for internal nodes, a leading child.
	pub(crate) fn push_front(&mut self, key: K, value: V, edge: Option<Edge<K, V>>) {
		self.insert_entry(0, key, value);
		if let Some(edge) = edge {
			self.children.insert(0, edge);
		}
	}

	/// Appends an entry and, for internal nodes, a trailing child.
	pub(crate) fn push_back(&mut self, key: K, value: V, edge: Option<Edge<K, V>>) {
		self.keys.push(key);
		self.values.push(value);
		if let Some(edge) = edge {
			self.children.push(edge);
		}
	}

	/// Appends a separator entry followed by all of `right`'s contents.
	pub(crate) fn absorb(&mut self, key: K, value: V, right: Node<K, V>) {
		self.keys.push(key);
		self.values.push(value);
		self.keys.extend(right.keys);
		self.values.extend(right.values);
		self.children.extend(right.children);
	}
}

impl<K: Clone, V: Clone> Node<K, V> {
	/// Splits the full child at `index`.
	///
	/// The child keeps its lower `t - 1` entries, a new sibling receives the
	/// upper `t - 1` entries (and upper `t` children), and the median entry
	/// moves up into this node at `index`, with the sibling inserted as
	/// child `index + 1`.
	pub(crate) fn split_child(&mut self, index: usize, degree: usize) {
		let child = Arc::make_mut(&mut self.children[index]);
		debug_assert!(child.is_full(degree), "only full children are split");

		let sibling = child.split_off(degree);
		let median = child.keys.pop().zip(child.values.pop());
		let (median_key, median_value) =
			median.unwrap_or_else(|| unreachable!("a full child has a median"));

		self.insert_entry(index, median_key, median_value);
		self.children.insert(index + 1, Arc::new(sibling));
	}

	/// Merges child `index + 1` and the separator key at `index` into child
	/// `index`. Both children must hold `t - 1` keys, so the result holds
	/// exactly `2t - 1`.
	pub(crate) fn merge_children(&mut self, index: usize) {
		let right = Arc::unwrap_or_clone(self.children.remove(index + 1));
		let (key, value) = self.remove_entry(index);
		Arc::make_mut(&mut self.children[index]).absorb(key, value, right);
	}

	/// Moves one entry from child `index - 1`, through the separator, into
	/// child `index`.
	pub(crate) fn borrow_from_left(&mut self, index: usize) {
		let (key, value, edge) = Arc::make_mut(&mut self.children[index - 1])
			.pop_last()
			.unwrap_or_else(|| unreachable!("left sibling lends from a non-empty node"));
		let key = std::mem::replace(&mut self.keys[index - 1], key);
		let value = std::mem::replace(&mut self.values[index - 1], value);
		Arc::make_mut(&mut self.children[index]).push_front(key, value, edge);
	}

	/// Moves one entry from child `index + 1`, through the separator, into
	/// child `index`.
	pub(crate) fn borrow_from_right(&mut self, index: usize) {
		let (key, value, edge) = Arc::make_mut(&mut self.children[index + 1])
			.pop_first()
			.unwrap_or_else(|| unreachable!("right sibling lends from a non-empty node"));
		let key = std::mem::replace(&mut self.keys[index], key);
		let value = std::mem::replace(&mut self.values[index], value);
		Arc::make_mut(&mut self.children[index]).push_back(key, value, edge);
	}
}

// ===========================================================================
// Read-only view
// ===========================================================================

/// A read-only view of a node, handed to [`BTree::walk`](crate::BTree::walk)
/// visitors.
pub struct NodeRef<'a, K, V> {
	node: &'a Node<K, V>,
	depth: usize,
}

impl<'a, K, V> NodeRef<'a, K, V> {
	pub(crate) fn new(node: &'a Node<K, V>, depth: usize) -> Self {
		NodeRef {
			node,
			depth,
		}
	}

	/// The node's keys in ascending order.
	pub fn keys(&self) -> &'a [K] {
		&self.node.keys
	}

	/// The node's values, parallel to [`keys`](Self::keys).
	pub fn values(&self) -> &'a [V] {
		&self.node.values
	}

	/// Number of keys held by the node.
	pub fn len(&self) -> usize {
		self.node.len()
	}

	/// Returns `true` if the node holds no keys (only possible for the root
	/// of an empty tree).
	pub fn is_empty(&self) -> bool {
		self.node.keys.is_empty()
	}

	/// Returns `true` if the node has no children.
	pub fn is_leaf(&self) -> bool {
		self.node.leaf
	}

	/// Number of children (zero for leaves).
	pub fn child_count(&self) -> usize {
		self.node.children.len()
	}

	/// Distance from the root; the root is at depth 0.
	pub fn depth(&self) -> usize {
		self.depth
	}

	/// Returns `true` for the root node.
	pub fn is_root(&self) -> bool {
		self.depth == 0
	}
}

impl<K: fmt::Debug, V> fmt::Debug for NodeRef<'_, K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeRef")
			.field("depth", &self.depth)
			.field("leaf", &self.node.leaf)
			.field("keys", &self.node.keys)
			.finish()
	}
}
