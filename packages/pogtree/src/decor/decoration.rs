use crate::domain::Symbol;
use crate::inference::engine::Distribution;
use crate::parsimony::optimal_set::OptimalSet;
use crate::tree::tree_instance::TreeInstance;
use eyre::Report;

/// Result of decorating one branch point
#[derive(Clone, Debug, PartialEq)]
pub enum Decoration<S: Symbol> {
  /// Value in the jointly most probable assignment
  Joint(S),
  /// Marginal posterior distribution
  Marginal(Distribution<S>),
  /// Every symbol taking part in some most parsimonious assignment
  Parsimony(OptimalSet<S>),
}

impl<S: Symbol> Decoration<S> {
  pub fn as_joint(&self) -> Option<S> {
    match self {
      Decoration::Joint(value) => Some(*value),
      _ => None,
    }
  }

  pub fn as_marginal(&self) -> Option<&Distribution<S>> {
    match self {
      Decoration::Marginal(dis) => Some(dis),
      _ => None,
    }
  }

  /// Symbols supported by the decoration: the joint value, the most probable symbol of the distribution, or the
  /// whole co-optimal set. `null` is never reported.
  pub fn supported_symbols(&self, null: Option<S>) -> Result<OptimalSet<S>, Report> {
    let mut set = match self {
      Decoration::Joint(value) => OptimalSet::from_symbol(*value),
      Decoration::Marginal(dis) => OptimalSet::from_symbol(dis.argmax()?),
      Decoration::Parsimony(set) => set.clone(),
    };
    if let Some(null) = &null {
      set.remove(null);
    }
    Ok(set)
  }
}

/// Infers decorations of branch points from the observations of a tree instance.
///
/// A decorator is decorated once and then queried. Decorating the same decorator from several threads at once is
/// not supported.
pub trait Decorator<S: Symbol>: Send {
  fn decorate(&mut self, instance: &TreeInstance<S>) -> Result<(), Report>;

  fn get_decoration(&self, idx: usize) -> Result<Decoration<S>, Report>;
}
