use crate::constants::MIN_BRANCH_LENGTH;
use crate::domain::{Domain, Symbol};
use crate::make_error;
use crate::model::subst_model::SubstModel;
use crate::tree::indexed_tree::IndexedTree;
use eyre::Report;
use itertools::Itertools;
use ndarray::{Array1, Array2};
use num_traits::clamp_min;
use std::sync::Arc;

/// Probability network shaped like the phylogenetic tree: one random variable per branch point.
///
/// The root variable carries the model's stationary distribution. Every other variable is conditioned on its parent
/// through the transition probabilities of the branch leading to it. Many alignment positions share one network and
/// only differ in evidence.
#[derive(Clone, Debug)]
pub struct TreeNetwork<S: Symbol> {
  tree: Arc<IndexedTree>,
  domain: Domain<S>,
  prior: Array1<f64>,
  /// `cpts[idx][[i, j]] = P(idx = j | parent(idx) = i)`; `None` for the root
  cpts: Vec<Option<Array2<f64>>>,
}

impl<S: Symbol> TreeNetwork<S> {
  pub fn build(tree: &Arc<IndexedTree>, model: &dyn SubstModel<S>, rate: f64) -> Result<Self, Report> {
    if !rate.is_finite() || rate < 0.0 {
      return make_error!("Relative rate must be finite and non-negative, but found {rate}");
    }
    if tree.size() == 0 {
      return make_error!("Unable to build inference network: tree is empty");
    }

    let domain = model.domain().clone();
    let prior = model.stationary();
    if prior.len() != domain.len() {
      return make_error!(
        "Substitution model is inconsistent: stationary distribution has {} entries, but domain has {} symbols",
        prior.len(),
        domain.len()
      );
    }

    let cpts = tree
      .iter_preorder()
      .map(|idx| {
        tree.parent(idx).map(|_| {
          let distance = fix_branch_length(tree.distance(idx));
          model.transition(distance * rate)
        })
      })
      .collect_vec();

    Ok(Self {
      tree: Arc::clone(tree),
      domain,
      prior,
      cpts,
    })
  }

  pub fn tree(&self) -> &Arc<IndexedTree> {
    &self.tree
  }

  pub fn domain(&self) -> &Domain<S> {
    &self.domain
  }

  pub fn prior(&self) -> &Array1<f64> {
    &self.prior
  }

  /// Conditional probability table of the branch point given its parent; `None` for the root
  pub fn cpt(&self, idx: usize) -> Option<&Array2<f64>> {
    self.cpts.get(idx).and_then(Option::as_ref)
  }
}

fn fix_branch_length(distance: f64) -> f64 {
  if distance.is_finite() {
    clamp_min(distance, MIN_BRANCH_LENGTH)
  } else {
    MIN_BRANCH_LENGTH
  }
}
