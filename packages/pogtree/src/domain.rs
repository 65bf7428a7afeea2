use crate::utils::error::AsrError;
use eyre::Report;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Values which can be observed at, or inferred for, a branch point
pub trait Symbol: Copy + Ord + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> Symbol for T where T: Copy + Ord + Hash + Debug + Display + Send + Sync + 'static {}

/// Finite, ordered set of symbols. Converts between symbols and the dense integer indices used by inference tables.
///
/// Symbol order is the insertion order. Tie-breaking throughout the crate favors lower indices, so the order
/// is meaningful.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Domain<S: Symbol> {
  symbols: Vec<S>,
  index: BTreeMap<S, usize>,
}

impl<S: Symbol> Domain<S> {
  /// Creates a domain from symbols. Duplicates are dropped, keeping the first occurrence.
  pub fn new(symbols: impl IntoIterator<Item = S>) -> Self {
    let symbols = symbols.into_iter().unique().collect_vec();
    let index = symbols.iter().enumerate().map(|(i, s)| (*s, i)).collect();
    Self { symbols, index }
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }

  pub fn symbols(&self) -> &[S] {
    &self.symbols
  }

  pub fn iter(&self) -> impl Iterator<Item = S> + '_ {
    self.symbols.iter().copied()
  }

  pub fn contains(&self, symbol: &S) -> bool {
    self.index.contains_key(symbol)
  }

  pub fn encode(&self, symbol: &S) -> Result<usize, Report> {
    self.index.get(symbol).copied().ok_or_else(|| {
      Report::new(AsrError::UnknownSymbol {
        symbol: symbol.to_string(),
      })
    })
  }

  pub fn decode(&self, index: usize) -> Result<S, Report> {
    self.symbols.get(index).copied().ok_or_else(|| {
      Report::new(AsrError::InvalidSymbol {
        index,
        size: self.symbols.len(),
      })
    })
  }
}
