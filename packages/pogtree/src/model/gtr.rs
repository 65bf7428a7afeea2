#![allow(non_snake_case)]

use crate::constants::TINY_NUMBER;
use crate::domain::{Domain, Symbol};
use crate::make_error;
use crate::model::subst_model::SubstModel;
use crate::utils::ndarray::{clamp_min, outer};
use eyre::{Report, WrapErr};
use ndarray::{array, Array1, Array2, Axis};
use ndarray_linalg::Eigh;
use ndarray_linalg::UPLO::Lower;

/// Eigendecomposition of the rate matrix `Q_ij = W_ij * pi_j` through its symmetric counterpart
/// `sqrt(pi_i) * Q_ij / sqrt(pi_j)`. Returns eigenvalues and the matrices `v` and `v_inv` such that
/// `Q = v * diag(eigvals) * v_inv`.
/// NOTE: this assumes the diagonal of W is all zeros
#[allow(clippy::type_complexity)]
fn eig_single_site(W: &Array2<f64>, pi: &Array1<f64>) -> Result<(Array1<f64>, Array2<f64>, Array2<f64>), Report> {
  let sqrt_pi: Array1<f64> = pi.mapv(f64::sqrt);
  let mut sym_Q: Array2<f64> = W * &outer(&sqrt_pi, &sqrt_pi)?;

  let diag = -(W * pi).sum_axis(Axis(1));
  sym_Q.diag_mut().assign(&diag);

  let (eigvals, eigvecs) = sym_Q
    .eigh(Lower)
    .wrap_err("When computing eigendecomposition of the rate matrix")?;

  let v = &eigvecs / &sqrt_pi.view().insert_axis(Axis(1));
  let v_inv = &eigvecs.t() * &sqrt_pi;

  Ok((eigvals, v, v_inv))
}

#[derive(Clone, Debug)]
pub struct GtrParams<S: Symbol> {
  pub domain: Domain<S>,
  pub mu: f64,
  /// Symmetric exchangeability matrix. The diagonal is ignored.
  pub W: Array2<f64>,
  pub pi: Array1<f64>,
}

/// General-Time-Reversible model of character evolution.
///
/// The rate matrix is `Q_ij = mu * W_ij * pi_j / r` where `r` normalizes the expected substitution rate at
/// equilibrium to `mu`. Transition probabilities `exp(Qt)` are computed in the eigenspace of `Q`.
#[derive(Clone, Debug)]
pub struct Gtr<S: Symbol> {
  domain: Domain<S>,
  pi: Array1<f64>,
  Q: Array2<f64>,
  eigvals: Array1<f64>,
  v: Array2<f64>,
  v_inv: Array2<f64>,
}

impl<S: Symbol> Gtr<S> {
  pub fn new(GtrParams { domain, mu, W, pi }: GtrParams<S>) -> Result<Self, Report> {
    let n = domain.len();
    if n == 0 {
      return make_error!("GTR model requires a non-empty domain");
    }
    if pi.len() != n {
      return make_error!(
        "Length of equilibrium frequency vector (`pi`) ({}) does not match the domain size ({n})",
        pi.len()
      );
    }
    if W.shape() != [n, n] {
      return make_error!(
        "Dimensions of exchangeability matrix (`W`) {:?} don't match the domain size ({n})",
        W.shape()
      );
    }
    if pi.iter().any(|&p| !p.is_finite() || p <= 0.0) {
      return make_error!("Equilibrium frequencies must be positive, but found {pi}");
    }
    if W.iter().any(|&w| !w.is_finite() || w < 0.0) {
      return make_error!("Exchangeabilities must be non-negative and finite");
    }

    let W = {
      let mut W = 0.5 * (&W.view() + &W.t());
      W.diag_mut().fill(0.0);
      W
    };

    let pi = &pi / pi.sum();

    let mut Q = &W * &outer(&Array1::ones(n), &pi)?;
    let row_sums = Q.sum_axis(Axis(1));
    Q.diag_mut().assign(&(-&row_sums));

    let average_rate = (&pi * &row_sums).sum();
    let scale = if average_rate > TINY_NUMBER { mu / average_rate } else { 1.0 };
    let Q = Q * scale;

    let (eigvals, v, v_inv) = eig_single_site(&W, &pi)?;
    let eigvals = eigvals * scale;

    Ok(Self {
      domain,
      pi,
      Q,
      eigvals,
      v,
      v_inv,
    })
  }

  fn exp_lt(&self, t: f64) -> Array1<f64> {
    (t * &self.eigvals).mapv(f64::exp)
  }

  /// Matrix exponential `exp(Qt)`
  pub fn expQt(&self, t: f64) -> Array2<f64> {
    let eLambdaT: Array2<f64> = Array2::from_diag(&self.exp_lt(t));
    let Qt: Array2<f64> = self.v.dot(&eLambdaT.dot(&self.v_inv));
    clamp_min(&Qt, 0.0)
  }

  pub fn rate_matrix(&self) -> &Array2<f64> {
    &self.Q
  }
}

impl Gtr<char> {
  /// Hasegawa, Kishino and Yano 1985 model over the ACGT alphabet.
  ///
  /// `kappa` is the ratio of transition to transversion rates.
  ///
  /// See: Hasegawa, Kishino, Yano (1985), J. Mol. Evol. 22 (2): 160–174. doi:10.1007/BF02101694
  pub fn hky85(kappa: f64, pi: Array1<f64>, mu: f64) -> Result<Self, Report> {
    if !kappa.is_finite() || kappa <= 0.0 {
      return make_error!("Transition/transversion ratio must be positive, but found kappa={kappa}");
    }
    #[rustfmt::skip]
    let W = array![
      [0.0,   1.0,   kappa, 1.0  ],
      [1.0,   0.0,   1.0,   kappa],
      [kappa, 1.0,   0.0,   1.0  ],
      [1.0,   kappa, 1.0,   0.0  ],
    ];
    Self::new(GtrParams {
      domain: Domain::new(['A', 'C', 'G', 'T']),
      mu,
      W,
      pi,
    })
  }
}

impl<S: Symbol> SubstModel<S> for Gtr<S> {
  fn domain(&self) -> &Domain<S> {
    &self.domain
  }

  fn stationary(&self) -> Array1<f64> {
    self.pi.clone()
  }

  fn transition(&self, t: f64) -> Array2<f64> {
    let mut P = self.expQt(t.max(0.0));
    for mut row in P.rows_mut() {
      let sum = row.sum();
      if sum > 0.0 {
        row /= sum;
      }
    }
    P
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::f81::F81;
  use approx::assert_abs_diff_eq;
  use rstest::rstest;

  #[rstest]
  #[case(0.01)]
  #[case(0.5)]
  #[case(3.0)]
  fn test_gtr_with_unit_exchangeabilities_equals_f81(#[case] t: f64) -> Result<(), Report> {
    let domain = Domain::new(['A', 'C', 'G', 'T']);
    let pi = array![0.1, 0.2, 0.3, 0.4];
    let gtr = Gtr::new(GtrParams {
      domain: domain.clone(),
      mu: 1.0,
      W: Array2::ones((4, 4)),
      pi: pi.clone(),
    })?;
    let f81 = F81::new(domain, pi, 1.0)?;
    assert_abs_diff_eq!(gtr.transition(t), f81.transition(t), epsilon = 1e-9);
    Ok(())
  }

  #[rstest]
  fn test_gtr_is_reversible() -> Result<(), Report> {
    let pi = array![0.1, 0.2, 0.3, 0.4];
    let gtr = Gtr::<char>::hky85(4.0, pi.clone(), 1.0)?;
    let P = gtr.transition(0.7);
    for i in 0..4 {
      for j in 0..4 {
        assert_abs_diff_eq!(pi[i] * P[[i, j]], pi[j] * P[[j, i]], epsilon = 1e-10);
      }
    }
    Ok(())
  }

  #[rstest]
  fn test_gtr_rate_is_normalized() -> Result<(), Report> {
    let pi = array![0.25, 0.25, 0.25, 0.25];
    let gtr = Gtr::<char>::hky85(2.0, pi.clone(), 2.0)?;
    let rate = -(&pi * &gtr.rate_matrix().diag()).sum();
    assert_abs_diff_eq!(rate, 2.0, epsilon = 1e-12);
    Ok(())
  }

  #[rstest]
  fn test_gtr_transition_at_zero_is_identity() -> Result<(), Report> {
    let gtr = Gtr::<char>::hky85(3.0, array![0.1, 0.2, 0.3, 0.4], 1.0)?;
    assert_abs_diff_eq!(gtr.transition(0.0), Array2::<f64>::eye(4), epsilon = 1e-10);
    Ok(())
  }

  #[rstest]
  fn test_gtr_transition_approaches_equilibrium() -> Result<(), Report> {
    let pi = array![0.1, 0.2, 0.3, 0.4];
    let gtr = Gtr::<char>::hky85(3.0, pi.clone(), 1.0)?;
    let P = gtr.transition(200.0);
    for row in P.rows() {
      assert_abs_diff_eq!(row.to_owned(), pi, epsilon = 1e-8);
    }
    Ok(())
  }

  #[rstest]
  fn test_gtr_eigendecomposition_reproduces_rate_matrix() -> Result<(), Report> {
    let gtr = Gtr::<char>::hky85(2.5, array![0.15, 0.35, 0.3, 0.2], 1.0)?;
    let Q = gtr.v.dot(&Array2::from_diag(&gtr.eigvals).dot(&gtr.v_inv));
    assert_abs_diff_eq!(Q, gtr.rate_matrix().clone(), epsilon = 1e-10);
    Ok(())
  }

  #[rstest]
  fn test_gtr_rejects_zero_frequency() {
    let res = Gtr::<char>::hky85(2.0, array![0.5, 0.5, 0.0, 0.0], 1.0);
    assert!(res.is_err());
  }

  #[rstest]
  fn test_gtr_rejects_mismatched_dimensions() {
    let res = Gtr::new(GtrParams {
      domain: Domain::new(['A', 'C']),
      mu: 1.0,
      W: Array2::ones((3, 3)),
      pi: array![0.5, 0.5],
    });
    assert!(res.is_err());
  }
}
