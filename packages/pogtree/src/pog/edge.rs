use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Evidence an edge of an ancestor POG rests on
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeStatus {
  /// Inferred from what follows the source position
  Forward,
  /// Inferred from what precedes the target position
  Backward,
  /// Inferred in both directions, or by a method which does not distinguish directions
  Reciprocated,
  /// Added without inference, e.g. during consensus search
  Uninferred,
}

impl EdgeStatus {
  /// Status of an edge seen with both statuses
  #[must_use]
  pub fn merge(self, other: EdgeStatus) -> EdgeStatus {
    match (self, other) {
      (a, b) if a == b => a,
      (EdgeStatus::Uninferred, x) | (x, EdgeStatus::Uninferred) => x,
      _ => EdgeStatus::Reciprocated,
    }
  }
}

impl Display for EdgeStatus {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      EdgeStatus::Forward => "forward",
      EdgeStatus::Backward => "backward",
      EdgeStatus::Reciprocated => "reciprocated",
      EdgeStatus::Uninferred => "uninferred",
    };
    write!(f, "{s}")
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PogEdge {
  pub status: EdgeStatus,
  /// Cost of traversing the edge during consensus search
  pub weight: f64,
}

impl PogEdge {
  pub fn new(status: EdgeStatus) -> Self {
    Self { status, weight: 0.0 }
  }
}
