use crate::constants::MAX_EDGE_WEIGHT;
use crate::make_error;
use crate::pog::edge::EdgeStatus;
use crate::pog::pog::{Pog, Position, START};
use crate::utils::error::AsrError;
use eyre::Report;
use itertools::Itertools;
use log::{trace, warn};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

/// Shortest path algorithm used to find the best supported path through a POG
#[derive(Copy, Clone, Debug, PartialEq, Eq, SmartDefault, Serialize, Deserialize)]
pub enum PathSearch {
  #[default]
  Dijkstra,
  /// A* with the cheapest outgoing edge as the remaining cost estimate
  AStar,
}

/// Edge cost for a transition shared by `count` of `total` descendants
fn edge_weight(count: usize, total: usize) -> f64 {
  if count == 0 || total == 0 {
    return MAX_EDGE_WEIGHT;
  }
  let rate = count as f64 / total as f64;
  (-rate.ln()).clamp(0.0, MAX_EDGE_WEIGHT)
}

impl Pog {
  /// Finds the start-to-end path best supported by the given descendant POGs. Returns the alignment positions on the
  /// path, in order, without sentinels.
  ///
  /// Every edge is weighted by `-ln(rate)`, where `rate` is the fraction of descendants having the same edge. An edge
  /// to end is synthesized for nodes where some descendant ends, unless already present. Weights and synthesized
  /// edges are stored in the POG, so repeated calls give the same result.
  pub fn most_supported_path(&mut self, support: &[&Pog], search: PathSearch) -> Result<Vec<usize>, Report> {
    self.weigh_edges(support)?;

    let path = match search {
      PathSearch::Dijkstra => self.shortest_path(|_| 0.0),
      PathSearch::AStar => {
        let cheapest_exit = self.cheapest_exits();
        self.shortest_path(|pos| cheapest_exit.get(&pos).copied().unwrap_or(0.0))
      }
    };

    let Some(path) = path else {
      return Err(Report::new(AsrError::NonContiguous {
        ancestor: self.name().to_owned(),
      }));
    };

    trace!("Most supported path through '{}': {:?}", self.name(), path);

    let end = self.end();
    Ok(
      path
        .into_iter()
        .filter(|&pos| pos != START && pos != end)
        .map(|pos| pos as usize)
        .collect_vec(),
    )
  }

  /// Weighs edges reachable from start by descendant support, visiting nodes in position order
  fn weigh_edges(&mut self, support: &[&Pog]) -> Result<(), Report> {
    if let Some(pog) = support.iter().find(|pog| pog.size() != self.size()) {
      return make_error!(
        "When weighing edges of POG '{}': descendant POG '{}' spans {} positions, but {} were expected",
        self.name(),
        pog.name(),
        pog.size(),
        self.size()
      );
    }
    if support.is_empty() {
      warn!(
        "POG '{}' has no descendants to support its edges. All paths will be weighed equally.",
        self.name()
      );
    }

    let end = self.end();
    let mut frontier = BTreeSet::from([START]);
    let mut visited = BTreeSet::new();
    while let Some(pos) = frontier.pop_first() {
      visited.insert(pos);

      let mut candidates = self.forward_neighbors(pos);
      if !candidates.contains(&end) && support.iter().any(|pog| pog.has_edge(pos, end)) {
        candidates.push(end);
      }

      for next in candidates {
        if !self.has_edge(pos, next) {
          self.add_edge(pos, next, EdgeStatus::Uninferred)?;
        }
        let count = support.iter().filter(|pog| pog.has_edge(pos, next)).count();
        self.set_weight(pos, next, edge_weight(count, support.len()))?;
        if next != end && !visited.contains(&next) {
          frontier.insert(next);
        }
      }
    }
    Ok(())
  }

  fn cheapest_exits(&self) -> BTreeMap<Position, f64> {
    let mut cheapest = BTreeMap::new();
    for ((from, _), edge) in self.edges() {
      cheapest
        .entry(from)
        .and_modify(|w: &mut f64| *w = w.min(edge.weight))
        .or_insert(edge.weight);
    }
    cheapest
  }

  /// Best-first search from start to end. With a zero heuristic this is Dijkstra's algorithm. Equal priorities are
  /// resolved towards the lower position.
  fn shortest_path(&self, heuristic: impl Fn(Position) -> f64) -> Option<Vec<Position>> {
    let end = self.end();
    let mut dist = BTreeMap::from([(START, 0.0)]);
    let mut prev = BTreeMap::new();
    let mut closed = BTreeSet::new();
    let mut heap = BinaryHeap::from([Reverse((OrderedFloat(heuristic(START)), START))]);

    while let Some(Reverse((_, pos))) = heap.pop() {
      if !closed.insert(pos) {
        continue;
      }
      if pos == end {
        break;
      }
      let g = dist.get(&pos).copied().unwrap_or(f64::INFINITY);
      for next in self.forward_neighbors(pos) {
        if closed.contains(&next) {
          continue;
        }
        let weight = self.edge(pos, next).map_or(MAX_EDGE_WEIGHT, |edge| edge.weight);
        let candidate = g + weight;
        if dist.get(&next).map_or(true, |&d| candidate < d) {
          dist.insert(next, candidate);
          prev.insert(next, pos);
          heap.push(Reverse((OrderedFloat(candidate + heuristic(next)), next)));
        }
      }
    }

    if !closed.contains(&end) {
      return None;
    }

    let mut path = vec![end];
    let mut pos = end;
    while let Some(&p) = prev.get(&pos) {
      path.push(p);
      pos = p;
    }
    path.reverse();
    Some(path)
  }
}
