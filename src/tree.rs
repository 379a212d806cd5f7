//! # Unlocked B-tree Algorithms
//!
//! [`RawTree`] owns the root and implements every structural algorithm.
//! It knows nothing about locking or modification counting; the public
//! [`BTree`](crate::BTree) handle wraps it in a lock and counts mutations.
//!
//! ## Insertion
//!
//! Insertion makes a single downward pass and never descends into a full
//! node: a full child is split before the descent, and a full root is
//! split after a new empty root is placed above it. Splitting the root is
//! the only way the tree grows taller.
//!
//! ```text
//!   insert 4 into a full root (t = 2)
//!
//!     [1 2 3]      ──►      [2]      ──►      [2]
//!                          /   \             /   \
//!                        [1]   [3]         [1]   [3 4]
//! ```
//!
//! ## Deletion
//!
//! Deletion is also a single downward pass. Before descending into a child
//! the algorithm makes sure the child holds at least `t` keys, so removing
//! one key further down can never leave a node under-occupied.
//!
//! ```text
//!   key found in leaf ───────────────────────────── case 1: remove in place
//!   key found in internal node x at i
//!       left child has >= t keys ─────────────────── case 2a: swap in predecessor
//!       right child has >= t keys ────────────────── case 2b: swap in successor
//!       otherwise ────────────────────────────────── case 2c: merge around key
//!   key not in internal node x, target child c
//!       c has >= t keys ──────────────────────────── descend
//!       a neighbour of c has >= t keys ───────────── case 3a: rotate one key
//!       otherwise ────────────────────────────────── case 3b: merge with neighbour
//! ```
//!
//! A merge at the root can leave it without keys; its only child then
//! becomes the root and the tree shrinks by one level.

use std::mem;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::node::{Comparator, Edge, Node, NodeRef};

/// A (node, index) pair identifying a single stored entry.
pub(crate) struct Locator<'a, K, V> {
	pub(crate) node: &'a Node<K, V>,
	pub(crate) index: usize,
}

impl<'a, K, V> Locator<'a, K, V> {
	#[inline]
	pub(crate) fn key(&self) -> &'a K {
		&self.node.keys[self.index]
	}

	#[inline]
	pub(crate) fn value(&self) -> &'a V {
		&self.node.values[self.index]
	}

	#[inline]
	pub(crate) fn entry(&self) -> (&'a K, &'a V) {
		(self.key(), self.value())
	}
}

/// The B-tree proper: root, degree, comparator and entry count.
pub(crate) struct RawTree<K, V> {
	pub(crate) root: Edge<K, V>,
	pub(crate) degree: usize,
	pub(crate) cmp: Comparator<K>,
	pub(crate) len: usize,
}

impl<K, V> RawTree<K, V> {
	/// Creates an empty tree: a single leaf root with no keys.
	pub(crate) fn new(degree: usize, cmp: Comparator<K>) -> Self {
		RawTree {
			root: Arc::new(Node::new(true)),
			degree,
			cmp,
			len: 0,
		}
	}

	/// Number of levels; a lone leaf root has height 1.
	pub(crate) fn height(&self) -> usize {
		let mut height = 1;
		let mut node = &*self.root;
		while !node.leaf {
			node = &*node.children[0];
			height += 1;
		}
		height
	}

	// -----------------------------------------------------------------------
	// Search
	// -----------------------------------------------------------------------

	/// Locates the slot holding `key`, if any.
	pub(crate) fn search(&self, key: &K) -> Option<Locator<'_, K, V>> {
		let mut node = &*self.root;
		loop {
			let (pos, found) = node.lower_bound(key, self.cmp);
			if found {
				return Some(Locator {
					node,
					index: pos,
				});
			}
			if node.leaf {
				return None;
			}
			node = &*node.children[pos];
		}
	}

	/// Returns the value stored under `key`.
	pub(crate) fn get(&self, key: &K) -> Option<&V> {
		self.search(key).map(|loc| loc.value())
	}

	/// Locates the smallest entry in the subtree rooted at `node`.
	pub(crate) fn first_locator(mut node: &Node<K, V>) -> Option<Locator<'_, K, V>> {
		while !node.leaf {
			node = &*node.children[0];
		}
		(!node.keys.is_empty()).then_some(Locator {
			node,
			index: 0,
		})
	}

	/// Locates the largest entry in the subtree rooted at `node`.
	pub(crate) fn last_locator(mut node: &Node<K, V>) -> Option<Locator<'_, K, V>> {
		while !node.leaf {
			node = &*node.children[node.children.len() - 1];
		}
		node.keys.len().checked_sub(1).map(|index| Locator {
			node,
			index,
		})
	}

	pub(crate) fn minimum(&self) -> Option<(&K, &V)> {
		Self::first_locator(&self.root).map(|loc| loc.entry())
	}

	pub(crate) fn maximum(&self) -> Option<(&K, &V)> {
		Self::last_locator(&self.root).map(|loc| loc.entry())
	}

	/// Finds the largest key strictly less than `key`.
	///
	/// `key` need not be stored. The descent carries the best ancestor
	/// candidate downward instead of walking back up through parents.
	pub(crate) fn predecessor(&self, key: &K) -> Option<&K> {
		let mut node = &*self.root;
		let mut candidate = None;
		loop {
			let (pos, found) = node.lower_bound(key, self.cmp);
			if found && !node.leaf {
				return Self::last_locator(&node.children[pos]).map(|loc| loc.key());
			}
			if pos > 0 {
				candidate = Some(&node.keys[pos - 1]);
			}
			if node.leaf {
				return candidate;
			}
			node = &*node.children[pos];
		}
	}

	/// Finds the smallest key strictly greater than `key`.
	pub(crate) fn successor(&self, key: &K) -> Option<&K> {
		let mut node = &*self.root;
		let mut candidate = None;
		loop {
			let (pos, found) = node.lower_bound(key, self.cmp);
			if found && !node.leaf {
				return Self::first_locator(&node.children[pos + 1]).map(|loc| loc.key());
			}
			let next = if found {
				pos + 1
			} else {
				pos
			};
			if next < node.len() {
				candidate = Some(&node.keys[next]);
			}
			if node.leaf {
				return candidate;
			}
			node = &*node.children[pos];
		}
	}

	// -----------------------------------------------------------------------
	// Traversal
	// -----------------------------------------------------------------------

	/// Visits every node in post-order: children left to right, then the
	/// node itself. The root is visited last.
	pub(crate) fn walk<F>(&self, visitor: &mut F)
	where
		F: FnMut(NodeRef<'_, K, V>),
	{
		Self::walk_node(&self.root, 0, visitor);
	}

	fn walk_node<F>(node: &Node<K, V>, depth: usize, visitor: &mut F)
	where
		F: FnMut(NodeRef<'_, K, V>),
	{
		for child in &node.children {
			Self::walk_node(child, depth + 1, visitor);
		}
		visitor(NodeRef::new(node, depth));
	}

	/// Calls `f` on every entry in ascending key order.
	pub(crate) fn for_each_entry<F>(&self, f: &mut F)
	where
		F: FnMut(&K, &V),
	{
		Self::for_each_in(&self.root, f);
	}

	fn for_each_in<F>(node: &Node<K, V>, f: &mut F)
	where
		F: FnMut(&K, &V),
	{
		for i in 0..node.len() {
			if !node.leaf {
				Self::for_each_in(&node.children[i], f);
			}
			f(&node.keys[i], &node.values[i]);
		}
		if let Some(last) = node.children.last() {
			Self::for_each_in(last, f);
		}
	}
}

impl<K: Clone, V: Clone> RawTree<K, V> {
	// -----------------------------------------------------------------------
	// Insertion
	// -----------------------------------------------------------------------

	/// Inserts a key that is known not to be present.
	pub(crate) fn insert(&mut self, key: K, value: V) {
		let degree = self.degree;
		if self.root.is_full(degree) {
			let old_root = mem::replace(&mut self.root, Arc::new(Node::new(false)));
			let root = Arc::make_mut(&mut self.root);
			root.children.push(old_root);
			root.split_child(0, degree);
			debug!(height = self.height(), "root split, tree grew by one level");
		}
		Self::insert_nonfull(Arc::make_mut(&mut self.root), key, value, degree, self.cmp);
		self.len += 1;
	}

	fn insert_nonfull(node: &mut Node<K, V>, key: K, value: V, degree: usize, cmp: Comparator<K>) {
		let (mut pos, found) = node.lower_bound(&key, cmp);
		debug_assert!(!found, "duplicate keys are rejected before insertion");

		if node.leaf {
			node.insert_entry(pos, key, value);
			return;
		}

		if node.children[pos].is_full(degree) {
			node.split_child(pos, degree);
			trace!(index = pos, "split full child before descending");
			// The promoted median may now sit between the key and its child.
			if cmp(&key, &node.keys[pos]).is_gt() {
				pos += 1;
			}
		}
		Self::insert_nonfull(Arc::make_mut(&mut node.children[pos]), key, value, degree, cmp);
	}

	// -----------------------------------------------------------------------
	// Deletion
	// -----------------------------------------------------------------------

	/// Removes `key`, returning its value. Absent keys are a no-op, although
	/// the descent may still rebalance nodes along the search path.
	pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
		let removed = Self::delete_from(Arc::make_mut(&mut self.root), key, self.degree, self.cmp);

		if self.root.keys.is_empty() && !self.root.leaf {
			let root = Arc::make_mut(&mut self.root);
			if let Some(child) = root.children.pop() {
				self.root = child;
				debug!(height = self.height(), "root emptied by merge, tree shrank by one level");
			}
		}

		if removed.is_some() {
			self.len -= 1;
		}
		removed
	}

	fn delete_from(node: &mut Node<K, V>, key: &K, degree: usize, cmp: Comparator<K>) -> Option<V> {
		let (pos, found) = node.lower_bound(key, cmp);

		// Case 1: leaf.
		if node.leaf {
			return found.then(|| node.remove_entry(pos).1);
		}

		if found {
			return Self::delete_internal(node, pos, degree, cmp);
		}

		// Case 3: make sure the target child can lose a key.
		let mut pos = pos;
		if node.children[pos].len() < degree {
			if pos > 0 && node.children[pos - 1].len() >= degree {
				node.borrow_from_left(pos);
				trace!(index = pos, "borrowed from left sibling");
			} else if pos < node.len() && node.children[pos + 1].len() >= degree {
				node.borrow_from_right(pos);
				trace!(index = pos, "borrowed from right sibling");
			} else if pos < node.len() {
				node.merge_children(pos);
				trace!(index = pos, "merged with right sibling");
			} else {
				pos -= 1;
				node.merge_children(pos);
				trace!(index = pos, "merged with left sibling");
			}
		}
		Self::delete_from(Arc::make_mut(&mut node.children[pos]), key, degree, cmp)
	}

	/// Case 2: `key` sits at `pos` in internal node `node`.
	fn delete_internal(node: &mut Node<K, V>, pos: usize, degree: usize, cmp: Comparator<K>) -> Option<V> {
		// 2a: replace with the predecessor, then delete it from the left subtree.
		if node.children[pos].len() >= degree {
			let (key, value) = Self::cloned_entry(Self::last_locator(&node.children[pos]));
			node.keys[pos] = key.clone();
			let removed = mem::replace(&mut node.values[pos], value);
			Self::delete_from(Arc::make_mut(&mut node.children[pos]), &key, degree, cmp);
			return Some(removed);
		}

		// 2b: symmetric, using the successor from the right subtree.
		if node.children[pos + 1].len() >= degree {
			let (key, value) = Self::cloned_entry(Self::first_locator(&node.children[pos + 1]));
			node.keys[pos] = key.clone();
			let removed = mem::replace(&mut node.values[pos], value);
			Self::delete_from(Arc::make_mut(&mut node.children[pos + 1]), &key, degree, cmp);
			return Some(removed);
		}

		// 2c: both neighbours are minimal; merge them around the key and
		// delete it from the merged child.
		let key = node.keys[pos].clone();
		node.merge_children(pos);
		trace!(index = pos, "merged children around deleted key");
		Self::delete_from(Arc::make_mut(&mut node.children[pos]), &key, degree, cmp)
	}

	fn cloned_entry(locator: Option<Locator<'_, K, V>>) -> (K, V) {
		match locator {
			Some(loc) => (loc.key().clone(), loc.value().clone()),
			None => unreachable!("a child holding at least t keys has an extreme entry"),
		}
	}

	/// Drops every entry, leaving a single empty leaf.
	pub(crate) fn clear(&mut self) {
		self.root = Arc::new(Node::new(true));
		self.len = 0;
	}
}

// ===========================================================================
// Structural validation
// ===========================================================================

impl<K: std::fmt::Debug, V> RawTree<K, V> {
	/// Panics with a diagnostic if any structural invariant is violated.
	///
	/// # Invariants Checked
	///
	/// 1. Keys strictly ascending within and across nodes
	/// 2. Internal nodes have exactly one more child than keys
	/// 3. All leaves at the same depth
	/// 4. Occupancy bounds: non-root nodes hold `t-1 ..= 2t-1` keys
	/// 5. Leaf flag agrees with the presence of children
	/// 6. An empty root is a leaf, and the entry count matches
	pub(crate) fn assert_invariants(&self) {
		let root = &*self.root;
		if root.keys.is_empty() {
			assert!(root.leaf, "Root has no keys but is internal");
			assert_eq!(self.len, 0, "Empty root but len is {}", self.len);
			return;
		}

		let mut leaf_depth = None;
		let mut count = 0;
		self.validate_node(root, 0, None, None, &mut leaf_depth, &mut count);
		assert_eq!(count, self.len, "Counted {} entries but len is {}", count, self.len);
	}

	fn validate_node(
		&self,
		node: &Node<K, V>,
		depth: usize,
		lower: Option<&K>,
		upper: Option<&K>,
		leaf_depth: &mut Option<usize>,
		count: &mut usize,
	) {
		let t = self.degree;
		let n = node.len();

		assert_eq!(n, node.values.len(), "keys.len() {} != values.len() {}", n, node.values.len());
		assert!(n <= 2 * t - 1, "Node at depth {} holds {} keys, max is {}", depth, n, 2 * t - 1);
		if depth > 0 {
			assert!(n >= t - 1, "Node at depth {} holds {} keys, min is {}", depth, n, t - 1);
		}

		for i in 1..n {
			assert!(
				(self.cmp)(&node.keys[i - 1], &node.keys[i]).is_lt(),
				"Keys not ascending at positions {} and {}: {:?} >= {:?}",
				i - 1,
				i,
				node.keys[i - 1],
				node.keys[i]
			);
		}
		if let (Some(lower), Some(first)) = (lower, node.keys.first()) {
			assert!(
				(self.cmp)(lower, first).is_lt(),
				"Key {:?} not greater than parent bound {:?}",
				first,
				lower
			);
		}
		if let (Some(upper), Some(last)) = (upper, node.keys.last()) {
			assert!(
				(self.cmp)(last, upper).is_lt(),
				"Key {:?} not less than parent bound {:?}",
				last,
				upper
			);
		}

		*count += n;

		if node.leaf {
			assert!(node.children.is_empty(), "Leaf at depth {} has children", depth);
			match *leaf_depth {
				None => *leaf_depth = Some(depth),
				Some(expected) => assert_eq!(
					depth, expected,
					"Leaf at depth {} but other leaves are at depth {}",
					depth, expected
				),
			}
			return;
		}

		assert_eq!(
			node.children.len(),
			n + 1,
			"Internal node at depth {} has {} keys but {} children",
			depth,
			n,
			node.children.len()
		);
		for (i, child) in node.children.iter().enumerate() {
			let child_lower = if i == 0 {
				lower
			} else {
				Some(&node.keys[i - 1])
			};
			let child_upper = node.keys.get(i).or(upper);
			self.validate_node(child, depth + 1, child_lower, child_upper, leaf_depth, count);
		}
	}
}
