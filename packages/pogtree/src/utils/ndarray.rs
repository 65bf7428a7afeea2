use crate::constants::TIE_TOLERANCE;
use eyre::Report;
use ndarray::{Array, Array1, Array2, ArrayView1, Dimension, Ix2};

// Calculates outer product of 2 vectors
pub fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Result<Array2<f64>, Report> {
  let a = a.to_shape((a.len(), 1))?.into_dimensionality::<Ix2>()?;
  let b = b.to_shape((1, b.len()))?.into_dimensionality::<Ix2>()?;
  Ok(a.dot(&b))
}

/// Normalizes a vector so that its elements sum to one. Returns the normalization constant.
pub fn normalize_inplace(dis: &mut Array1<f64>) -> f64 {
  let norm = dis.sum();
  if norm > 0.0 {
    dis.mapv_inplace(|x| x / norm);
  }
  norm
}

/// Whether `x` is larger than `best` by more than the tie tolerance.
#[inline]
pub fn is_strictly_better(x: f64, best: f64) -> bool {
  if best == f64::NEG_INFINITY {
    return x > best;
  }
  x > best + TIE_TOLERANCE * f64::max(1.0, best.abs())
}

/// Finds index of the max value. Values within tie tolerance of each other are considered equal and the lowest
/// index among them wins. Returns `None` for empty input or when all values are `-inf` or NaN.
pub fn argmax_first(arr: ArrayView1<f64>) -> Option<usize> {
  let mut best: Option<(usize, f64)> = None;
  for (i, &x) in arr.iter().enumerate() {
    if x.is_nan() || x == f64::NEG_INFINITY {
      continue;
    }
    match best {
      None => best = Some((i, x)),
      Some((_, b)) if is_strictly_better(x, b) => best = Some((i, x)),
      _ => {}
    }
  }
  best.map(|(i, _)| i)
}

/// Clamp each element to at least `lower`
pub fn clamp_min<T: Copy + PartialOrd, D: Dimension>(a: &Array<T, D>, lower: T) -> Array<T, D> {
  a.mapv(|x| num_traits::clamp_min(x, lower))
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_abs_diff_eq;
  use ndarray::array;
  use rstest::rstest;

  #[rstest]
  fn computes_outer_product() -> Result<(), Report> {
    assert_abs_diff_eq!(
      outer(&array![0.0, 1.0, 2.0], &array![-1.0, 0.0, 1.0])?,
      array![[-0.0, 0.0, 0.0], [-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0]]
    );
    Ok(())
  }

  #[rstest]
  fn computes_argmax_first_with_ties() {
    assert_eq!(argmax_first(array![0.1, 0.4, 0.4, 0.2].view()), Some(1));
    assert_eq!(argmax_first(array![0.4, 0.4 + 1e-15, 0.1].view()), Some(0));
    assert_eq!(argmax_first(array![f64::NEG_INFINITY, -3.0].view()), Some(1));
    assert_eq!(argmax_first(array![f64::NEG_INFINITY, f64::NEG_INFINITY].view()), None);
    assert_eq!(argmax_first(Array1::<f64>::zeros(0).view()), None);
  }

  #[rstest]
  fn normalizes() {
    let mut dis = array![1.0, 3.0];
    let norm = normalize_inplace(&mut dis);
    assert_abs_diff_eq!(norm, 4.0);
    assert_abs_diff_eq!(dis, array![0.25, 0.75]);
  }

  #[rstest]
  fn clamps_min() {
    assert_abs_diff_eq!(
      clamp_min(&array![[-1e-17, 0.5], [0.2, -0.3]], 0.0),
      array![[0.0, 0.5], [0.2, 0.0]]
    );
  }
}
