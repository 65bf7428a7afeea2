use crate::make_error;
use crate::tree::indexed_tree::{BranchPoint, IndexedTree};
use eyre::Report;
use itertools::Itertools;

#[derive(Clone, Debug)]
struct PendingNode {
  label: String,
  distance: f64,
  parent: Option<usize>,
  children: Vec<usize>,
}

/// Assembles a tree from nodes and edges given in any order, then re-indexes it depth-first.
#[derive(Clone, Debug, Default)]
pub struct TreeBuilder {
  nodes: Vec<PendingNode>,
}

impl TreeBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds a node and returns its builder key. Keys are not the final tree indices.
  pub fn add_node(&mut self, label: impl Into<String>, distance: f64) -> usize {
    let key = self.nodes.len();
    self.nodes.push(PendingNode {
      label: label.into(),
      distance,
      parent: None,
      children: vec![],
    });
    key
  }

  pub fn add_edge(&mut self, parent: usize, child: usize) -> Result<(), Report> {
    let n = self.nodes.len();
    if parent >= n || child >= n {
      return make_error!("When adding a tree edge {parent}->{child}: node not found");
    }
    if parent == child {
      return make_error!("When adding a tree edge {parent}->{child}: attempted to connect node to itself");
    }
    if let Some(existing) = self.nodes[child].parent {
      return make_error!(
        "When adding a tree edge {parent}->{child}: node '{}' already has a parent '{}'",
        self.nodes[child].label,
        self.nodes[existing].label
      );
    }
    self.nodes[child].parent = Some(parent);
    self.nodes[parent].children.push(child);
    Ok(())
  }

  pub fn build(self) -> Result<IndexedTree, Report> {
    let roots = self
      .nodes
      .iter()
      .enumerate()
      .filter_map(|(key, node)| node.parent.is_none().then_some(key))
      .collect_vec();

    let root = match roots.as_slice() {
      [root] => *root,
      [] => return make_error!("Tree has no root: every node has a parent"),
      _ => return make_error!("Tree has {} roots, but exactly one is expected", roots.len()),
    };

    if let Some(duplicate) = self.nodes.iter().map(|node| &node.label).duplicates().next() {
      return make_error!("Branch point labels must be unique, but found duplicate label '{duplicate}'");
    }

    // Depth-first, keeping children in insertion order
    let mut order = Vec::with_capacity(self.nodes.len());
    let mut new_index = vec![None; self.nodes.len()];
    let mut stack = vec![root];
    while let Some(key) = stack.pop() {
      new_index[key] = Some(order.len());
      order.push(key);
      stack.extend(self.nodes[key].children.iter().rev());
    }

    if order.len() != self.nodes.len() {
      return make_error!(
        "Tree is not connected: only {} of {} nodes are reachable from the root",
        order.len(),
        self.nodes.len()
      );
    }

    let nodes = order
      .iter()
      .map(|&key| {
        let node = &self.nodes[key];
        BranchPoint {
          label: node.label.clone(),
          parent: node.parent.and_then(|p| new_index[p]),
          children: node.children.iter().filter_map(|&c| new_index[c]).collect_vec(),
          distance: node.distance,
        }
      })
      .collect_vec();

    Ok(IndexedTree::from_preordered(nodes))
  }
}
