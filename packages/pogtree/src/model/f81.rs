use crate::domain::{Domain, Symbol};
use crate::make_error;
use crate::model::subst_model::SubstModel;
use eyre::Report;
use ndarray::{Array1, Array2};

/// Felsenstein 1981 model over an arbitrary domain.
///
/// Assumes non-equal equilibrium frequencies, but the same rate of change into a given state from all other states.
/// With uniform frequencies this is the Jukes-Cantor model generalized to any number of states. The rate is scaled
/// so that `mu` is the expected number of substitutions per unit of time.
///
/// See: Felsenstein (1981), J. Mol. Evol. 17 (6): 368–376. doi:10.1007/BF01734359
#[derive(Clone, Debug)]
pub struct F81<S: Symbol> {
  domain: Domain<S>,
  pi: Array1<f64>,
  beta: f64,
}

impl<S: Symbol> F81<S> {
  pub fn new(domain: Domain<S>, pi: Array1<f64>, mu: f64) -> Result<Self, Report> {
    if domain.is_empty() {
      return make_error!("F81 model requires a non-empty domain");
    }
    if pi.len() != domain.len() {
      return make_error!(
        "Length of equilibrium frequency vector ({}) does not match the domain size ({})",
        pi.len(),
        domain.len()
      );
    }
    if pi.iter().any(|&p| !p.is_finite() || p < 0.0) || pi.sum() <= 0.0 {
      return make_error!("Equilibrium frequencies must be non-negative and sum to a positive value, but found {pi}");
    }
    if !mu.is_finite() || mu < 0.0 {
      return make_error!("Substitution rate must be non-negative, but found mu={mu}");
    }

    let pi = &pi / pi.sum();
    let heterozygosity = 1.0 - pi.mapv(|p| p * p).sum();
    let beta = if heterozygosity > 0.0 { mu / heterozygosity } else { 0.0 };

    Ok(Self { domain, pi, beta })
  }

  /// Jukes-Cantor: uniform equilibrium frequencies
  pub fn uniform(domain: Domain<S>, mu: f64) -> Result<Self, Report> {
    let n = domain.len();
    Self::new(domain, Array1::ones(n), mu)
  }
}

impl<S: Symbol> SubstModel<S> for F81<S> {
  fn domain(&self) -> &Domain<S> {
    &self.domain
  }

  fn stationary(&self) -> Array1<f64> {
    self.pi.clone()
  }

  fn transition(&self, t: f64) -> Array2<f64> {
    let n = self.domain.len();
    let stay = (-self.beta * t.max(0.0)).exp();
    let mut p = Array2::from_shape_fn((n, n), |(_, j)| (1.0 - stay) * self.pi[j]);
    p.diag_mut().mapv_inplace(|x| x + stay);
    p
  }
}
