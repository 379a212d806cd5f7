//! Test utilities for loading sample trees from JSON fixtures
//!
//! A fixture spells out every node, so tests can start from an exact shape
//! instead of whatever a particular insertion order happens to produce.
//! Each key's value is its lowercase form.
use crate::node::Node;
use crate::tree::RawTree;
use crate::BTree;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize, Debug)]
struct TreeNode {
	keys: Vec<String>,
	#[serde(default)]
	children: Vec<TreeNode>,
}

#[derive(Deserialize, Debug)]
struct SampleTree {
	min_degree: usize,
	root: TreeNode,
}

fn translate_node(tree_node: TreeNode, len: &mut usize) -> Node<String, String> {
	let mut node = Node::new(tree_node.children.is_empty());
	for (pos, key) in tree_node.keys.into_iter().enumerate() {
		let value = key.to_lowercase();
		node.insert_entry(pos, key, value);
		*len += 1;
	}
	for child in tree_node.children {
		node.children.push(Arc::new(translate_node(child, len)));
	}
	node
}

pub fn sample_tree<P: AsRef<std::path::Path>>(path: P) -> BTree<String, String> {
	let file = std::fs::File::open(path).expect("failed to find file");
	let json_tree: SampleTree = serde_json::from_reader(file).unwrap();
	let degree = json_tree.min_degree;
	let mut len = 0;
	let root = translate_node(json_tree.root, &mut len);
	BTree::from_raw(RawTree {
		root: Arc::new(root),
		degree,
		cmp: String::cmp,
		len,
	})
}
