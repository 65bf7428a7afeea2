use crate::domain::{Domain, Symbol};
use crate::make_error;
use crate::network::tree_network::TreeNetwork;
use crate::utils::ndarray::argmax_first;
use eyre::Report;
use ndarray::Array1;
use std::sync::Arc;

/// Joint assignment of one symbol to every branch point, indexed like the tree
pub type Assignment<S> = Vec<S>;

/// Posterior probability distribution over the domain at one branch point
#[derive(Clone, Debug, PartialEq)]
pub struct Distribution<S: Symbol> {
  domain: Domain<S>,
  probs: Array1<f64>,
}

impl<S: Symbol> Distribution<S> {
  pub fn new(domain: Domain<S>, probs: Array1<f64>) -> Result<Self, Report> {
    if probs.len() != domain.len() {
      return make_error!(
        "Distribution has {} entries, but its domain has {} symbols",
        probs.len(),
        domain.len()
      );
    }
    Ok(Self { domain, probs })
  }

  pub fn domain(&self) -> &Domain<S> {
    &self.domain
  }

  pub fn probs(&self) -> &Array1<f64> {
    &self.probs
  }

  pub fn get(&self, symbol: &S) -> Result<f64, Report> {
    Ok(self.probs[self.domain.encode(symbol)?])
  }

  /// Most probable symbol. Ties go to the symbol listed first in the domain.
  pub fn argmax(&self) -> Result<S, Report> {
    match argmax_first(self.probs.view()) {
      Some(i) => self.domain.decode(i),
      None => make_error!("Unable to find the most probable symbol: distribution has no finite entries"),
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (S, f64)> + '_ {
    self.domain.iter().zip(self.probs.iter().copied())
  }
}

/// Exact inference over a tree-shaped network.
///
/// An engine is instantiated once per network and may be queried many times with different evidence. Tie-breaking
/// must be deterministic for a fixed network and evidence.
pub trait InferenceEngine<S: Symbol>: Send {
  fn instantiate(network: Arc<TreeNetwork<S>>) -> Self
  where
    Self: Sized;

  fn network(&self) -> &TreeNetwork<S>;

  fn set_evidence(&mut self, idx: usize, value: S) -> Result<(), Report>;

  fn reset_evidence(&mut self);

  /// Most probable explanation: the jointly most probable assignment of all branch points
  fn make_mpe(&self) -> Result<Assignment<S>, Report>;

  /// Marginal posterior distribution of one branch point
  fn make_query(&self, idx: usize) -> Result<Distribution<S>, Report>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_ulps_eq;
  use ndarray::array;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_distribution_argmax_prefers_first_on_tie() -> Result<(), Report> {
    let dis = Distribution::new(Domain::new(['A', 'C', 'G']), array![0.2, 0.4, 0.4])?;
    assert_eq!('C', dis.argmax()?);
    assert_ulps_eq!(0.4, dis.get(&'G')?);
    Ok(())
  }

  #[test]
  fn test_distribution_rejects_size_mismatch() {
    assert!(Distribution::new(Domain::new(['A', 'C']), array![1.0]).is_err());
  }
}
