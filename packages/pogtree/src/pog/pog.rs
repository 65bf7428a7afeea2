use crate::make_error;
use crate::pog::edge::{EdgeStatus, PogEdge};
use crate::utils::error::AsrError;
use eyre::Report;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::{Display, Formatter};

/// Alignment position, or one of the two sentinels
pub type Position = isize;

/// Virtual node preceding every alignment position
pub const START: Position = -1;

/// Partial order graph over the columns `0..size` of an alignment.
///
/// Besides the alignment positions there are two virtual nodes: start (`-1`) and end (`size`). Both are always
/// present. Edges always point from a lower to a higher position, so the graph is acyclic and position order is a
/// topological order.
#[derive(Clone, Debug, PartialEq)]
pub struct Pog {
  name: String,
  size: usize,
  nodes: BTreeSet<usize>,
  edges: BTreeMap<(Position, Position), PogEdge>,
  /// `(to, from)` for every edge
  incoming: BTreeSet<(Position, Position)>,
}

impl Pog {
  /// POG without any alignment position and without edges
  pub fn new(name: impl Into<String>, size: usize) -> Self {
    Self {
      name: name.into(),
      size,
      nodes: BTreeSet::new(),
      edges: BTreeMap::new(),
      incoming: BTreeSet::new(),
    }
  }

  /// Linear POG of an aligned sequence: a node for every non-gap entry, chained in order from start to end
  pub fn from_aligned<T>(name: impl Into<String>, row: &[Option<T>]) -> Result<Self, Report> {
    let mut pog = Self::new(name, row.len());
    let mut prev = START;
    for (pos, _) in row.iter().enumerate().filter(|(_, entry)| entry.is_some()) {
      pog.add_node(pos)?;
      pog.add_edge(prev, pos as Position, EdgeStatus::Reciprocated)?;
      prev = pos as Position;
    }
    pog.add_edge(prev, pog.end(), EdgeStatus::Reciprocated)?;
    Ok(pog)
  }

  /// Gapless linear POG `start -> 0 -> 1 -> ... -> size-1 -> end`
  pub fn linear(name: impl Into<String>, size: usize) -> Result<Self, Report> {
    Self::from_aligned(name, &vec![Some(()); size])
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Number of alignment positions, not counting sentinels
  pub fn size(&self) -> usize {
    self.size
  }

  pub const fn start(&self) -> Position {
    START
  }

  pub fn end(&self) -> Position {
    self.size as Position
  }

  pub fn is_node(&self, pos: Position) -> bool {
    pos == START || pos == self.end() || (pos >= 0 && self.nodes.contains(&(pos as usize)))
  }

  /// Alignment positions present in the POG, in order
  pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
    self.nodes.iter().copied()
  }

  pub fn n_nodes(&self) -> usize {
    self.nodes.len()
  }

  /// Adds an alignment position. Returns whether it was absent before.
  pub fn add_node(&mut self, pos: usize) -> Result<bool, Report> {
    if pos >= self.size {
      return make_error!(
        "In POG '{}': position {pos} is out of range of the alignment of length {}",
        self.name,
        self.size
      );
    }
    Ok(self.nodes.insert(pos))
  }

  /// Removes an alignment position together with all its edges. Returns whether it was present.
  pub fn remove_node(&mut self, pos: usize) -> bool {
    if !self.nodes.remove(&pos) {
      return false;
    }
    let pos = pos as Position;
    for next in self.forward_neighbors(pos) {
      self.remove_edge(pos, next);
    }
    for prev in self.backward_neighbors(pos) {
      self.remove_edge(prev, pos);
    }
    true
  }

  /// Adds an edge between two present nodes. An existing edge keeps its weight and merges the status.
  pub fn add_edge(&mut self, from: Position, to: Position, status: EdgeStatus) -> Result<(), Report> {
    if from >= to {
      return make_error!(
        "In POG '{}': edge {from}->{to} does not point to a later position",
        self.name
      );
    }
    if !self.is_node(from) || !self.is_node(to) {
      return make_error!(
        "In POG '{}': unable to add edge {from}->{to}: both endpoints must be present nodes",
        self.name
      );
    }
    self
      .edges
      .entry((from, to))
      .and_modify(|edge| edge.status = edge.status.merge(status))
      .or_insert_with(|| PogEdge::new(status));
    self.incoming.insert((to, from));
    Ok(())
  }

  /// Adds an edge, first adding any absent endpoint
  pub fn force_edge(&mut self, from: Position, to: Position, status: EdgeStatus) -> Result<(), Report> {
    for pos in [from, to] {
      if pos >= 0 && pos < self.end() {
        self.add_node(pos as usize)?;
      }
    }
    self.add_edge(from, to, status)
  }

  pub fn remove_edge(&mut self, from: Position, to: Position) -> Option<PogEdge> {
    self.incoming.remove(&(to, from));
    self.edges.remove(&(from, to))
  }

  pub fn edge(&self, from: Position, to: Position) -> Option<&PogEdge> {
    self.edges.get(&(from, to))
  }

  pub fn has_edge(&self, from: Position, to: Position) -> bool {
    self.edges.contains_key(&(from, to))
  }

  pub fn set_weight(&mut self, from: Position, to: Position, weight: f64) -> Result<(), Report> {
    match self.edges.get_mut(&(from, to)) {
      Some(edge) => {
        edge.weight = weight;
        Ok(())
      }
      None => make_error!("In POG '{}': edge {from}->{to} not found", self.name),
    }
  }

  pub fn edges(&self) -> impl Iterator<Item = ((Position, Position), &PogEdge)> + '_ {
    self.edges.iter().map(|(&key, edge)| (key, edge))
  }

  /// Targets of edges leaving the node, in increasing order
  pub fn forward_neighbors(&self, pos: Position) -> Vec<Position> {
    self
      .edges
      .range((pos, Position::MIN)..=(pos, Position::MAX))
      .map(|(&(_, to), _)| to)
      .collect_vec()
  }

  /// Sources of edges entering the node, in increasing order
  pub fn backward_neighbors(&self, pos: Position) -> Vec<Position> {
    self
      .incoming
      .range((pos, Position::MIN)..=(pos, Position::MAX))
      .map(|&(_, from)| from)
      .collect_vec()
  }

  fn reachable(&self, from: Position, neighbors: impl Fn(&Self, Position) -> Vec<Position>) -> BTreeSet<Position> {
    let mut seen = BTreeSet::from([from]);
    let mut queue = VecDeque::from([from]);
    while let Some(pos) = queue.pop_front() {
      for next in neighbors(self, pos) {
        if seen.insert(next) {
          queue.push_back(next);
        }
      }
    }
    seen
  }

  /// Nodes reachable from start
  pub fn reachable_from_start(&self) -> BTreeSet<Position> {
    self.reachable(START, Self::forward_neighbors)
  }

  /// Nodes from which end is reachable
  pub fn reaching_end(&self) -> BTreeSet<Position> {
    self.reachable(self.end(), Self::backward_neighbors)
  }

  /// Whether there is at least one path from start to end
  pub fn is_contiguous(&self) -> bool {
    self.reachable_from_start().contains(&self.end())
  }

  /// Dead ends: nodes, including sentinels, without a way out (other than end) or without a way in (other than
  /// start).
  pub fn protruding_nodes(&self) -> BTreeSet<Position> {
    let end = self.end();
    std::iter::once(START)
      .chain(self.nodes.iter().map(|&pos| pos as Position))
      .chain(std::iter::once(end))
      .filter(|&pos| {
        let no_exit = pos != end && self.forward_neighbors(pos).is_empty();
        let no_entry = pos != START && self.backward_neighbors(pos).is_empty();
        no_exit || no_entry
      })
      .collect()
  }

  /// Whether the node lacks outgoing edges, i.e. needs to be continued forward
  pub fn lacks_exit(&self, pos: Position) -> bool {
    pos != self.end() && self.forward_neighbors(pos).is_empty()
  }

  /// Whether the node lacks incoming edges, i.e. needs to be continued backward
  pub fn lacks_entry(&self, pos: Position) -> bool {
    pos != START && self.backward_neighbors(pos).is_empty()
  }

  /// Removes nodes which lie on no path from start to end. Returns the removed positions.
  pub fn nibble(&mut self) -> Result<Vec<usize>, Report> {
    if !self.is_contiguous() {
      return Err(Report::new(AsrError::NonContiguous {
        ancestor: self.name.clone(),
      }));
    }
    let from_start = self.reachable_from_start();
    let to_end = self.reaching_end();
    let removed = self
      .nodes
      .iter()
      .copied()
      .filter(|&pos| {
        let pos = pos as Position;
        !(from_start.contains(&pos) && to_end.contains(&pos))
      })
      .collect_vec();
    for &pos in &removed {
      self.remove_node(pos);
    }
    Ok(removed)
  }
}

impl Display for Pog {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let edges = self.edges.keys().map(|(from, to)| format!("{from}->{to}")).join(" ");
    write!(f, "{}[{}]: {edges}", self.name, self.size)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::utils::error::find_asr_error;
  use maplit::btreeset;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_pog_from_aligned_skips_gaps() -> Result<(), Report> {
    let pog = Pog::from_aligned("seq", &[Some('A'), None, Some('C'), None])?;
    assert_eq!(vec![0, 2], pog.nodes().collect_vec());
    assert_eq!(vec![0], pog.forward_neighbors(START));
    assert_eq!(vec![2], pog.forward_neighbors(0));
    assert_eq!(vec![4], pog.forward_neighbors(2));
    assert_eq!(vec![2], pog.backward_neighbors(4));
    assert!(pog.is_contiguous());
    assert_eq!("seq[4]: -1->0 0->2 2->4", pog.to_string());
    Ok(())
  }

  #[test]
  fn test_pog_of_empty_sequence_links_sentinels() -> Result<(), Report> {
    let pog = Pog::from_aligned::<char>("empty", &[None, None])?;
    assert_eq!(0, pog.n_nodes());
    assert!(pog.has_edge(START, 2));
    Ok(())
  }

  #[test]
  fn test_pog_rejects_invalid_edges() -> Result<(), Report> {
    let mut pog = Pog::new("a", 5);
    pog.add_node(1)?;
    pog.add_node(3)?;
    assert!(pog.add_edge(3, 1, EdgeStatus::Forward).is_err());
    assert!(pog.add_edge(1, 2, EdgeStatus::Forward).is_err());
    assert!(pog.add_edge(1, 1, EdgeStatus::Forward).is_err());
    assert!(pog.add_node(5).is_err());
    pog.add_edge(1, 3, EdgeStatus::Forward)?;
    pog.add_edge(1, 3, EdgeStatus::Backward)?;
    assert_eq!(EdgeStatus::Reciprocated, pog.edge(1, 3).unwrap().status);
    Ok(())
  }

  #[test]
  fn test_pog_protruding_nodes() -> Result<(), Report> {
    // start -> 0 -> 1    2 -> end
    let mut pog = Pog::new("a", 3);
    pog.add_node(0)?;
    pog.add_node(1)?;
    pog.add_node(2)?;
    pog.add_edge(START, 0, EdgeStatus::Forward)?;
    pog.add_edge(0, 1, EdgeStatus::Forward)?;
    pog.add_edge(2, 3, EdgeStatus::Forward)?;
    assert!(!pog.is_contiguous());
    assert_eq!(btreeset! {1, 2}, pog.protruding_nodes());

    pog.add_edge(1, 2, EdgeStatus::Forward)?;
    assert!(pog.is_contiguous());
    assert!(pog.protruding_nodes().is_empty());
    Ok(())
  }

  #[test]
  fn test_pog_protruding_sentinels() {
    let pog = Pog::new("a", 2);
    assert_eq!(btreeset! {START, 2}, pog.protruding_nodes());
  }

  #[test]
  fn test_pog_nibble_removes_nodes_off_every_path() -> Result<(), Report> {
    // start -> 0 -> 2 -> end, with 1 reachable from 0 but leading nowhere, and 3 leading to end but unreachable
    let mut pog = Pog::new("a", 4);
    for pos in 0..4 {
      pog.add_node(pos)?;
    }
    pog.add_edge(START, 0, EdgeStatus::Forward)?;
    pog.add_edge(0, 1, EdgeStatus::Forward)?;
    pog.add_edge(0, 2, EdgeStatus::Forward)?;
    pog.add_edge(2, 4, EdgeStatus::Forward)?;
    pog.add_edge(3, 4, EdgeStatus::Forward)?;

    assert_eq!(vec![1, 3], pog.nibble()?);
    assert_eq!(vec![0, 2], pog.nodes().collect_vec());
    assert!(!pog.has_edge(0, 1));
    assert!(!pog.has_edge(3, 4));
    assert_eq!(vec![2], pog.backward_neighbors(4));
    Ok(())
  }

  #[test]
  fn test_pog_nibble_requires_contiguity() {
    let mut pog = Pog::new("anc", 2);
    let report = pog.nibble().unwrap_err();
    assert_eq!(
      Some(&AsrError::NonContiguous {
        ancestor: "anc".to_owned()
      }),
      find_asr_error(&report)
    );
  }

  #[test]
  fn test_pog_force_edge_adds_endpoints() -> Result<(), Report> {
    let mut pog = Pog::new("a", 3);
    pog.force_edge(START, 1, EdgeStatus::Forward)?;
    pog.force_edge(1, 3, EdgeStatus::Backward)?;
    assert_eq!(vec![1], pog.nodes().collect_vec());
    assert!(pog.is_contiguous());
    Ok(())
  }
}
