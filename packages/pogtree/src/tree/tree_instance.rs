use crate::domain::{Domain, Symbol};
use crate::make_error;
use crate::tree::indexed_tree::IndexedTree;
use crate::utils::error::AsrError;
use eyre::Report;
use itertools::Itertools;
use std::sync::Arc;

/// Observations over one tree: an optional value from a finite domain for every branch point.
///
/// `None` means unobserved, i.e. to be inferred.
#[derive(Clone, Debug)]
pub struct TreeInstance<S: Symbol> {
  tree: Arc<IndexedTree>,
  domain: Domain<S>,
  values: Vec<Option<S>>,
}

impl<S: Symbol> TreeInstance<S> {
  /// Instance with every branch point unobserved
  pub fn new(tree: Arc<IndexedTree>, domain: Domain<S>) -> Self {
    let values = vec![None; tree.size()];
    Self { tree, domain, values }
  }

  pub fn with_values(tree: Arc<IndexedTree>, domain: Domain<S>, values: Vec<Option<S>>) -> Result<Self, Report> {
    if values.len() != tree.size() {
      return make_error!(
        "Tree instance expects one value per branch point ({}), but got {}",
        tree.size(),
        values.len()
      );
    }
    for value in values.iter().flatten() {
      domain.encode(value)?;
    }
    Ok(Self { tree, domain, values })
  }

  pub fn tree(&self) -> &Arc<IndexedTree> {
    &self.tree
  }

  pub fn domain(&self) -> &Domain<S> {
    &self.domain
  }

  pub fn value(&self, idx: usize) -> Option<S> {
    self.values.get(idx).copied().flatten()
  }

  pub fn values(&self) -> &[Option<S>] {
    &self.values
  }

  pub fn set(&mut self, idx: usize, value: Option<S>) -> Result<(), Report> {
    if idx >= self.values.len() {
      return make_error!("Branch point #{idx} is out of range of the tree of size {}", self.values.len());
    }
    if let Some(value) = &value {
      self.domain.encode(value)?;
    }
    self.values[idx] = value;
    Ok(())
  }

  /// Observed value at the branch point, as a dense domain index
  pub fn encoded(&self, idx: usize) -> Result<Option<usize>, Report> {
    self.value(idx).map(|value| self.domain.encode(&value)).transpose()
  }

  /// Observed branch points and their values
  pub fn observed(&self) -> impl Iterator<Item = (usize, S)> + '_ {
    self
      .values
      .iter()
      .enumerate()
      .filter_map(|(idx, value)| value.map(|value| (idx, value)))
  }

  /// Value shared by all leaves, if every leaf is observed and they agree
  pub fn unanimous_leaf_value(&self) -> Option<S> {
    self
      .tree
      .leaves()
      .into_iter()
      .map(|leaf| self.value(leaf))
      .all_equal_value()
      .ok()
      .flatten()
  }

  pub fn is_bound_to(&self, tree: &Arc<IndexedTree>) -> bool {
    Arc::ptr_eq(&self.tree, tree)
  }

  pub fn check_bound_to(&self, tree: &Arc<IndexedTree>) -> Result<(), Report> {
    if self.is_bound_to(tree) {
      Ok(())
    } else {
      Err(Report::new(AsrError::InvalidTopology))
    }
  }
}
