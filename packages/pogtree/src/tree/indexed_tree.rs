use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A node of the phylogenetic tree: an ancestor or an extant sequence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchPoint {
  pub label: String,
  pub parent: Option<usize>,
  pub children: Vec<usize>,
  /// Length of the branch leading to this node from its parent
  pub distance: f64,
}

/// Rooted tree stored as an arena of branch points in depth-first (pre-)order.
///
/// Invariant: the root is at index 0 and every parent has a smaller index than any of its children. This allows
/// pre-order traversal by ascending index and post-order traversal (children before parents) by descending index,
/// without recursion. Construct with `TreeBuilder`.
///
/// # Panics
///
/// Queries taking a branch point index (`parent`, `children`, `label`, etc.) panic if the index is out of range,
/// like slice indexing. Use `get` to look up an index of unknown origin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexedTree {
  nodes: Vec<BranchPoint>,
}

impl IndexedTree {
  pub(crate) fn from_preordered(nodes: Vec<BranchPoint>) -> Self {
    debug_assert!(nodes
      .iter()
      .enumerate()
      .all(|(i, node)| node.parent.map_or(i == 0, |parent| parent < i)));
    Self { nodes }
  }

  pub fn size(&self) -> usize {
    self.nodes.len()
  }

  pub fn root(&self) -> usize {
    0
  }

  /// Branch point at `idx`, or `None` if out of range
  pub fn get(&self, idx: usize) -> Option<&BranchPoint> {
    self.nodes.get(idx)
  }

  pub fn parent(&self, idx: usize) -> Option<usize> {
    self.nodes[idx].parent
  }

  pub fn children(&self, idx: usize) -> &[usize] {
    &self.nodes[idx].children
  }

  pub fn is_leaf(&self, idx: usize) -> bool {
    self.nodes[idx].children.is_empty()
  }

  pub fn is_root(&self, idx: usize) -> bool {
    self.nodes[idx].parent.is_none()
  }

  pub fn distance(&self, idx: usize) -> f64 {
    self.nodes[idx].distance
  }

  pub fn label(&self, idx: usize) -> &str {
    &self.nodes[idx].label
  }

  pub fn find_label(&self, label: &str) -> Option<usize> {
    self.nodes.iter().position(|node| node.label == label)
  }

  /// Parents before children
  pub fn iter_preorder(&self) -> impl DoubleEndedIterator<Item = usize> {
    0..self.nodes.len()
  }

  /// Children before parents
  pub fn iter_postorder(&self) -> impl Iterator<Item = usize> {
    (0..self.nodes.len()).rev()
  }

  pub fn leaves(&self) -> Vec<usize> {
    self.iter_preorder().filter(|&idx| self.is_leaf(idx)).collect_vec()
  }

  /// Internal branch points, i.e. the ancestors to reconstruct
  pub fn ancestors(&self) -> Vec<usize> {
    self.iter_preorder().filter(|&idx| !self.is_leaf(idx)).collect_vec()
  }

  /// All branch points of the subtree rooted at `idx`, including `idx`, in pre-order
  pub fn subtree(&self, idx: usize) -> Vec<usize> {
    let mut result = vec![];
    let mut stack = vec![idx];
    while let Some(current) = stack.pop() {
      result.push(current);
      stack.extend(self.children(current).iter().rev());
    }
    result
  }

  /// Leaves of the subtree rooted at `idx`
  pub fn leaves_below(&self, idx: usize) -> Vec<usize> {
    self
      .subtree(idx)
      .into_iter()
      .filter(|&i| self.is_leaf(i))
      .sorted()
      .collect_vec()
  }

  /// Path from the root down to `idx`, both inclusive
  pub fn path_from_root(&self, idx: usize) -> Vec<usize> {
    let mut path = vec![idx];
    let mut current = idx;
    while let Some(parent) = self.parent(current) {
      path.push(parent);
      current = parent;
    }
    path.reverse();
    path
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tree::tree_builder::tests::example_tree;
  use eyre::Report;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_tree_parents_precede_children() -> Result<(), Report> {
    let tree = example_tree()?;
    for idx in tree.iter_preorder() {
      for &child in tree.children(idx) {
        assert!(idx < child);
        assert_eq!(Some(idx), tree.parent(child));
      }
    }
    Ok(())
  }

  #[test]
  fn test_tree_leaves_and_ancestors() -> Result<(), Report> {
    let tree = example_tree()?;
    let leaves = tree.leaves().into_iter().map(|i| tree.label(i).to_owned()).sorted().collect_vec();
    let ancestors = tree.ancestors().into_iter().map(|i| tree.label(i).to_owned()).collect_vec();
    assert_eq!(vec!["A", "B", "C", "D"], leaves);
    assert_eq!(vec!["root", "AB", "CD"], ancestors);
    Ok(())
  }

  #[test]
  fn test_tree_leaves_below_and_path() -> Result<(), Report> {
    let tree = example_tree()?;
    let ab = tree.find_label("AB").unwrap();
    let a = tree.find_label("A").unwrap();
    let labels = tree.leaves_below(ab).into_iter().map(|i| tree.label(i).to_owned()).collect_vec();
    assert_eq!(vec!["A", "B"], labels);
    assert_eq!(vec![0, ab, a], tree.path_from_root(a));
    assert_eq!(tree.size(), tree.leaves_below(tree.root()).len() + tree.ancestors().len());
    Ok(())
  }

  #[test]
  fn test_tree_get_is_checked() -> Result<(), Report> {
    let tree = example_tree()?;
    assert_eq!(Some("root"), tree.get(0).map(|node| node.label.as_str()));
    assert!(tree.get(tree.size()).is_none());
    Ok(())
  }

  #[test]
  #[should_panic]
  fn test_tree_label_panics_out_of_range() {
    let tree = example_tree().unwrap();
    let _ = tree.label(tree.size());
  }
}
