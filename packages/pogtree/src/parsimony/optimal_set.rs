use crate::domain::Symbol;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;

/// Set of co-optimal symbols at one branch point
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OptimalSet<S: Symbol> {
  data: BTreeSet<S>,
}

impl<S: Symbol> Default for OptimalSet<S> {
  fn default() -> Self {
    Self::new()
  }
}

impl<S: Symbol> OptimalSet<S> {
  /// Create an empty set
  pub fn new() -> Self {
    Self { data: BTreeSet::new() }
  }

  pub fn from_symbols<I, T>(symbols: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Borrow<S>,
  {
    Self {
      data: symbols.into_iter().map(|s| *s.borrow()).collect(),
    }
  }

  pub fn from_symbol(symbol: S) -> Self {
    Self::from_symbols([symbol])
  }

  pub fn remove(&mut self, symbol: &S) -> bool {
    self.data.remove(symbol)
  }

  pub fn contains(&self, symbol: &S) -> bool {
    self.data.contains(symbol)
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = S> + '_ {
    self.data.iter().copied()
  }

  /// Access internal set implementation
  pub fn inner(&self) -> &BTreeSet<S> {
    &self.data
  }
}

impl<S: Symbol> FromIterator<S> for OptimalSet<S> {
  fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
    Self {
      data: iter.into_iter().collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use maplit::btreeset;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_optimal_set_from_symbols() {
    let symbols = btreeset!['A', 'C', 'G', 'T'];
    let set = OptimalSet::from_symbols(&symbols);
    assert_eq!(&symbols, set.inner());
  }

  #[test]
  fn test_optimal_set_remove() {
    let mut set = OptimalSet::from_symbols(['A', '-']);
    assert!(set.remove(&'-'));
    assert!(!set.remove(&'-'));
    assert_eq!(1, set.len());
    assert!(set.contains(&'A'));
  }
}
