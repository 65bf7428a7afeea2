use crate::pog::pog::{Pog, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Jump edge `from -> to` over the alignment positions strictly between its endpoints, i.e. a candidate deletion
/// of the span `from+1..to`.
///
/// Ordered by start, then by end.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
  pub from: Position,
  pub to: Position,
}

impl Interval {
  pub const fn new(from: Position, to: Position) -> Self {
    Self { from, to }
  }

  /// Whether `other` lies within this interval
  pub const fn contains(&self, other: &Interval) -> bool {
    self.from <= other.from && other.to <= self.to
  }

  /// Number of skipped positions
  pub const fn span(&self) -> usize {
    (self.to - self.from - 1).unsigned_abs()
  }

  /// Coding of a sequence for this interval: `Some(true)` if the sequence makes the jump, `Some(false)` if it has
  /// a residue inside the skipped span, and `None` if neither can be told.
  pub fn code(&self, pog: &Pog) -> Option<bool> {
    if pog.has_edge(self.from, self.to) {
      Some(true)
    } else if ((self.from + 1)..self.to).any(|pos| pog.is_node(pos)) {
      Some(false)
    } else {
      None
    }
  }
}

impl Display for Interval {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "({}, {})", self.from, self.to)
  }
}

/// All jump edges skipping at least one position in any of the POGs
pub fn collect_intervals<'a>(pogs: impl IntoIterator<Item = &'a Pog>) -> BTreeSet<Interval> {
  pogs
    .into_iter()
    .flat_map(|pog| pog.edges().map(|(key, _)| key).collect::<Vec<_>>())
    .filter(|&(from, to)| to > from + 1)
    .map(|(from, to)| Interval::new(from, to))
    .collect()
}
