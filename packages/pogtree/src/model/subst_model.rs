use crate::domain::{Domain, Symbol};
use ndarray::{Array1, Array2};

/// Continuous-time model of symbol substitution along a branch
pub trait SubstModel<S: Symbol>: Send + Sync {
  fn domain(&self) -> &Domain<S>;

  /// Stationary (equilibrium) distribution, used as the prior at the root
  fn stationary(&self) -> Array1<f64>;

  /// Transition probabilities after time `t`: element `[i, j]` is `P(child = j | parent = i)`
  fn transition(&self, t: f64) -> Array2<f64>;
}
