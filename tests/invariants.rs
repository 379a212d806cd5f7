//! # Invariant Testing for the Spruce B-tree
//!
//! This module contains tests specifically designed to validate tree
//! invariants around structural changes. It focuses on:
//!
//! - Boundary conditions for splits and root growth
//! - Borrow and merge boundaries, including root collapse
//! - Randomized operations with invariant validation after every step

use rand::prelude::*;
use spruce::BTree;

fn root_children<K, V>(tree: &BTree<K, V>) -> usize {
	let mut children = 0;
	tree.walk(|node| {
		if node.is_root() {
			children = node.child_count();
		}
	});
	children
}

fn node_sizes<K, V>(tree: &BTree<K, V>) -> Vec<(usize, usize)> {
	let mut sizes = Vec::new();
	tree.walk(|node| sizes.push((node.depth(), node.len())));
	sizes
}

// ===========================================================================
// Split Boundary Tests
// ===========================================================================

/// Test split at exact root capacity.
/// Fills the root leaf to 2t-1 keys, then inserts one more to trigger a split.
#[test]
fn split_at_exact_root_capacity() {
	for t in 2..=8 {
		let tree: BTree<i32, i32> = BTree::with_degree(t).unwrap();
		let max_keys = (2 * t - 1) as i32;

		for i in 0..max_keys {
			tree.insert(i, i * 10).unwrap();
		}

		tree.assert_invariants();
		assert_eq!(tree.height(), 1, "Full root should not split yet (t={})", t);

		tree.insert(max_keys, max_keys * 10).unwrap();

		tree.assert_invariants();
		assert_eq!(tree.height(), 2, "Expected height 2 after root split (t={})", t);
		assert_eq!(root_children(&tree), 2);

		for i in 0..=max_keys {
			assert_eq!(tree.get(&i), Some(i * 10), "Key {} not found after split", i);
		}
	}
}

/// Every node after a root split holds exactly t-1 keys on each side.
#[test]
fn split_halves_are_minimal() {
	let t = 4;
	let tree: BTree<i32, i32> = BTree::with_degree(t).unwrap();
	for i in 0..(2 * t as i32) {
		tree.insert(i, i).unwrap();
	}

	let sizes = node_sizes(&tree);
	assert_eq!(sizes, vec![(1, t - 1), (1, t), (0, 1)]);
}

/// Test the height growing step by step under sequential inserts.
#[test]
fn height_grows_logarithmically() {
	let tree: BTree<i32, i32> = BTree::with_degree(2).unwrap();
	let mut last_height = 1;

	for i in 0..4096 {
		tree.insert(i, i).unwrap();
		let height = tree.height();
		assert!(height == last_height || height == last_height + 1, "Height jumped at {}", i);
		last_height = height;
	}

	tree.assert_invariants();
	// A 2-3-4 tree of n keys has height at most log2(n + 1).
	assert!(tree.height() <= 12, "Height {} too large", tree.height());
}

#[test]
fn splits_with_reverse_order() {
	let tree: BTree<i32, i32> = BTree::with_degree(3).unwrap();

	for i in (0..2000).rev() {
		tree.insert(i, i).unwrap();
	}

	tree.assert_invariants();
	assert_eq!(tree.len(), 2000);
	assert_eq!(tree.minimum(), Some((0, 0)));
	assert_eq!(tree.maximum(), Some((1999, 1999)));
}

// ===========================================================================
// Merge Boundary Tests
// ===========================================================================

/// Deleting down to a single key shrinks the tree back to one leaf.
#[test]
fn merges_collapse_to_single_leaf() {
	let tree: BTree<i32, i32> = BTree::with_degree(2).unwrap();
	for i in 0..500 {
		tree.insert(i, i).unwrap();
	}
	assert!(tree.height() > 3);

	let mut last_height = tree.height();
	for i in 0..499 {
		tree.delete(&i).unwrap();
		let height = tree.height();
		assert!(height == last_height || height + 1 == last_height, "Height jumped at {}", i);
		last_height = height;
	}

	tree.assert_invariants();
	assert_eq!(tree.height(), 1);
	assert_eq!(tree.len(), 1);
	assert_eq!(tree.get(&499), Some(499));
}

/// Deleting from the middle exercises internal-node cases 2a, 2b and 2c.
#[test]
fn delete_internal_keys() {
	let tree: BTree<i32, i32> = BTree::with_degree(3).unwrap();
	for i in 0..1000 {
		tree.insert(i, i).unwrap();
	}

	// Collect the keys that currently live in internal nodes.
	let mut internal_keys = Vec::new();
	tree.walk(|node| {
		if !node.is_leaf() {
			internal_keys.extend_from_slice(node.keys());
		}
	});
	assert!(!internal_keys.is_empty());

	for k in &internal_keys {
		assert_eq!(tree.remove(k), Some(*k), "Failed to remove internal key {}", k);
		tree.assert_invariants();
	}
	assert_eq!(tree.len(), 1000 - internal_keys.len());
}

#[test]
fn merge_then_split_same_region() {
	let tree: BTree<i32, i32> = BTree::with_degree(2).unwrap();

	for round in 0..5 {
		for i in 0..200 {
			tree.insert(i, i + round).unwrap();
		}
		tree.assert_invariants();
		for i in (0..200).filter(|i| i % 4 != 0) {
			tree.delete(&i).unwrap();
		}
		tree.assert_invariants();
		for i in (0..200).filter(|i| i % 4 == 0) {
			tree.delete(&i).unwrap();
		}
		tree.assert_invariants();
		assert!(tree.is_empty());
	}
}

// ===========================================================================
// Randomized Invariant Tests
// ===========================================================================

#[test]
fn random_operations_with_invariant_checks() {
	let mut rng = StdRng::seed_from_u64(0x5eed);

	for t in 2..=5 {
		let tree: BTree<i32, i32> = BTree::with_degree(t).unwrap();
		let mut expected = std::collections::BTreeMap::new();

		for _ in 0..3000 {
			let key = rng.random_range(0..300);
			if rng.random_bool(0.55) {
				if tree.insert(key, key).is_ok() {
					expected.insert(key, key);
				}
			} else {
				assert_eq!(tree.remove(&key), expected.remove(&key));
			}
			tree.assert_invariants();
		}

		assert_eq!(tree.len(), expected.len());
	}
}

/// All leaves sit at the same depth and every non-root node is within bounds.
#[test]
fn occupancy_bounds_via_walk() {
	let t = 3;
	let tree: BTree<i32, i32> = BTree::with_degree(t).unwrap();
	let mut rng = StdRng::seed_from_u64(11);
	let mut keys: Vec<i32> = (0..2000).collect();
	keys.shuffle(&mut rng);
	for k in &keys {
		tree.insert(*k, *k).unwrap();
	}
	for k in keys.iter().take(1200) {
		tree.delete(k).unwrap();
	}

	let mut leaf_depths = std::collections::HashSet::new();
	tree.walk(|node| {
		if node.is_leaf() {
			leaf_depths.insert(node.depth());
		}
		if !node.is_root() {
			assert!(node.len() >= t - 1 && node.len() <= 2 * t - 1);
		}
		if !node.is_leaf() {
			assert_eq!(node.child_count(), node.len() + 1);
		}
	});
	assert_eq!(leaf_depths.len(), 1);
}

// ===========================================================================
// Edge Cases
// ===========================================================================

#[test]
fn empty_tree_invariants() {
	let tree: BTree<i32, i32> = BTree::with_degree(2).unwrap();
	tree.assert_invariants();
	assert_eq!(tree.height(), 1);
	assert_eq!(root_children(&tree), 0);
}

#[test]
fn boundary_key_values() {
	let tree: BTree<i64, i64> = BTree::with_degree(2).unwrap();
	for k in [i64::MIN, i64::MAX, 0, -1, 1] {
		tree.insert(k, k).unwrap();
	}
	tree.assert_invariants();
	assert_eq!(tree.minimum(), Some((i64::MIN, i64::MIN)));
	assert_eq!(tree.maximum(), Some((i64::MAX, i64::MAX)));
	assert_eq!(tree.predecessor(&i64::MIN).unwrap(), None);
	assert_eq!(tree.successor(&i64::MAX).unwrap(), None);
}

#[test]
fn tree_after_deleting_all() {
	let tree: BTree<i32, i32> = BTree::with_degree(4).unwrap();
	for i in 0..300 {
		tree.insert(i, i).unwrap();
	}
	for i in 0..300 {
		tree.delete(&i).unwrap();
	}
	tree.assert_invariants();
	assert!(tree.is_empty());
	assert_eq!(tree.height(), 1);

	tree.insert(1, 1).unwrap();
	tree.assert_invariants();
	assert_eq!(tree.len(), 1);
}
