use crate::make_internal_report;
use eyre::Report;
use rand::{seq::IteratorRandom, Rng, SeedableRng};
use rand_isaac::Isaac64Rng;

pub fn get_random_number_generator(seed: Option<u64>) -> (impl Rng + Send + Sync + Clone) {
  match seed {
    None => Isaac64Rng::from_entropy(),
    Some(seed) => Isaac64Rng::seed_from_u64(seed),
  }
}

pub fn random_choice<T>(iter: impl IntoIterator<Item = T>, rng: &mut impl Rng) -> Result<T, Report> {
  iter
    .into_iter()
    .choose(rng)
    .ok_or_else(|| make_internal_report!("random_choice: expected at least one item, but none found"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_random_choice_is_reproducible_with_seed() -> Result<(), Report> {
    let mut rng1 = get_random_number_generator(Some(42));
    let mut rng2 = get_random_number_generator(Some(42));
    let a = (0..10).map(|_| random_choice(0..100, &mut rng1)).collect::<Result<Vec<_>, _>>()?;
    let b = (0..10).map(|_| random_choice(0..100, &mut rng2)).collect::<Result<Vec<_>, _>>()?;
    assert_eq!(a, b);
    Ok(())
  }

  #[test]
  fn test_random_choice_fails_on_empty() {
    let mut rng = get_random_number_generator(Some(0));
    assert!(random_choice(Vec::<usize>::new(), &mut rng).is_err());
  }
}
