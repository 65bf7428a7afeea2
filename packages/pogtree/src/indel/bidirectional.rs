use crate::domain::Domain;
use crate::indel::predict::{IndelCaller, IndelContext};
use crate::pog::edge::EdgeStatus;
use crate::pog::pog::{Pog, Position, START};
use crate::tree::tree_instance::TreeInstance;
use eyre::{Report, WrapErr};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Other end of an edge leaving (or entering) a position, or `Null` for a sequence lacking the position.
///
/// `Null` orders after every real target, so it takes the last index of every domain it is part of and loses
/// exact ties against real edges.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeTarget {
  Pos(Position),
  Null,
}

impl Display for EdgeTarget {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      EdgeTarget::Pos(pos) => write!(f, "{pos}"),
      EdgeTarget::Null => write!(f, "null"),
    }
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
  /// What follows a position
  Forward,
  /// What precedes a position
  Backward,
}

impl Direction {
  pub fn neighbors(self, pog: &Pog, pos: Position) -> Vec<Position> {
    match self {
      Direction::Forward => pog.forward_neighbors(pos),
      Direction::Backward => pog.backward_neighbors(pos),
    }
  }

  /// Edge `(from, to)` between a position and a neighbor in this direction
  pub const fn edge(self, pos: Position, neighbor: Position) -> (Position, Position) {
    match self {
      Direction::Forward => (pos, neighbor),
      Direction::Backward => (neighbor, pos),
    }
  }

  pub const fn status(self) -> EdgeStatus {
    match self {
      Direction::Forward => EdgeStatus::Forward,
      Direction::Backward => EdgeStatus::Backward,
    }
  }
}

impl Display for Direction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Direction::Forward => write!(f, "forward"),
      Direction::Backward => write!(f, "backward"),
    }
  }
}

/// Leaf observations of the edges at `pos` in the given direction.
///
/// Leaves lacking the position are observed as `Null` when `with_null` is set, and left unobserved otherwise.
/// The domain is the sorted set of observed targets, with `Null` appended when requested. Returns `None` if no
/// leaf has the position.
pub(crate) fn edge_instance(
  ctx: &IndelContext,
  pos: Position,
  direction: Direction,
  with_null: bool,
) -> Result<Option<TreeInstance<EdgeTarget>>, Report> {
  let target_of = |pog: &Pog| {
    if pog.is_node(pos) {
      direction.neighbors(pog, pos).first().map(|&neighbor| EdgeTarget::Pos(neighbor))
    } else {
      with_null.then_some(EdgeTarget::Null)
    }
  };

  let targets = ctx
    .extants
    .values()
    .filter_map(&target_of)
    .filter(|target| *target != EdgeTarget::Null)
    .sorted()
    .dedup()
    .collect_vec();
  if targets.is_empty() {
    return Ok(None);
  }

  let domain = Domain::new(targets.into_iter().chain(with_null.then_some(EdgeTarget::Null)));
  ctx.leaf_instance(&domain, target_of).map(Some)
}

/// Infers, independently, the edge leaving every position (start included) and the edge entering every position
/// (end included), and takes the union of both per ancestor.
///
/// The two directions are not reconciled, so the resulting POGs may be disconnected.
pub fn infer(ctx: &IndelContext, caller: IndelCaller) -> Result<BTreeMap<usize, Pog>, Report> {
  let end = ctx.width as Position;
  let queries = (START..end)
    .map(|pos| (Direction::Forward, pos))
    .chain((0..=end).map(|pos| (Direction::Backward, pos)))
    .collect_vec();

  let mut keys = vec![];
  let mut instances = vec![];
  for (direction, pos) in queries {
    let instance = edge_instance(ctx, pos, direction, true)
      .wrap_err_with(|| format!("When collecting {direction} edges of position {pos}"))?;
    if let Some(instance) = instance {
      keys.push((direction, pos));
      instances.push(instance);
    }
  }

  let calls = ctx.call_ancestors(instances, caller, Some(EdgeTarget::Null))?;

  let mut pogs = ctx.empty_ancestor_pogs();
  for ((direction, pos), call) in keys.into_iter().zip(calls) {
    for (anc, targets) in call {
      let Some(pog) = pogs.get_mut(&anc) else {
        continue;
      };
      for target in targets.iter() {
        if let EdgeTarget::Pos(neighbor) = target {
          let (from, to) = direction.edge(pos, neighbor);
          pog.force_edge(from, to, direction.status())?;
        }
      }
    }
  }
  Ok(pogs)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alignment::alignment::Alignment;
  use crate::scheduler::decoration_pool::DecorationPool;
  use crate::tree::indexed_tree::IndexedTree;
  use crate::tree::tree_builder::tests::star_tree;
  use pretty_assertions::assert_eq;
  use rstest::rstest;
  use std::sync::Arc;

  fn star_extants(tree: &IndexedTree, rows: &[(&str, &str)]) -> Result<BTreeMap<usize, Pog>, Report> {
    let aln = Alignment::new(rows.iter().copied())?;
    tree
      .leaves()
      .into_iter()
      .map(|leaf| Ok((leaf, aln.extant_pog(tree.label(leaf))?)))
      .collect()
  }

  fn root_edges(rows: &[(&str, &str)], caller: IndelCaller) -> Result<Vec<((Position, Position), EdgeStatus)>, Report> {
    let labels = rows.iter().map(|(name, _)| *name).collect_vec();
    let tree = Arc::new(star_tree(&labels)?);
    let extants = star_extants(&tree, rows)?;
    let pool = DecorationPool::new(1)?;
    let ctx = IndelContext {
      tree: &tree,
      extants: &extants,
      width: rows[0].1.len(),
      pool: &pool,
    };
    let pogs = infer(&ctx, caller)?;
    Ok(pogs[&tree.root()].edges().map(|(key, edge)| (key, edge.status)).collect())
  }

  #[test]
  fn test_edge_target_null_is_last() {
    let domain = Domain::new([EdgeTarget::Pos(3), EdgeTarget::Pos(-1), EdgeTarget::Null].into_iter().sorted());
    assert_eq!(&[EdgeTarget::Pos(-1), EdgeTarget::Pos(3), EdgeTarget::Null], domain.symbols());
    assert_eq!("null", EdgeTarget::Null.to_string());
  }

  #[rstest]
  #[case(0, Direction::Forward, true, vec![Some(EdgeTarget::Pos(1)), Some(EdgeTarget::Pos(2))])]
  #[case(1, Direction::Forward, true, vec![Some(EdgeTarget::Pos(2)), Some(EdgeTarget::Null)])]
  #[case(1, Direction::Forward, false, vec![Some(EdgeTarget::Pos(2)), None])]
  #[case(2, Direction::Backward, true, vec![Some(EdgeTarget::Pos(1)), Some(EdgeTarget::Pos(0))])]
  fn test_edge_instance_observes_leaves(
    #[case] pos: Position,
    #[case] direction: Direction,
    #[case] with_null: bool,
    #[case] expected: Vec<Option<EdgeTarget>>,
  ) -> Result<(), Report> {
    let tree = Arc::new(star_tree(&["A", "B"])?);
    let extants = star_extants(&tree, &[("A", "AC"), ("B", "A-")])?;
    let pool = DecorationPool::new(1)?;
    let ctx = IndelContext {
      tree: &tree,
      extants: &extants,
      width: 2,
      pool: &pool,
    };
    let instance = edge_instance(&ctx, pos, direction, with_null)?.ok_or_else(|| eyre::eyre!("No instance"))?;
    assert_eq!(expected, instance.values()[1..].to_vec());
    assert_eq!(with_null, instance.domain().contains(&EdgeTarget::Null));
    Ok(())
  }

  #[test]
  fn test_edge_instance_absent_everywhere() -> Result<(), Report> {
    let tree = Arc::new(star_tree(&["A", "B"])?);
    let extants = star_extants(&tree, &[("A", "A-"), ("B", "A-")])?;
    let pool = DecorationPool::new(1)?;
    let ctx = IndelContext {
      tree: &tree,
      extants: &extants,
      width: 2,
      pool: &pool,
    };
    assert!(edge_instance(&ctx, 1, Direction::Forward, true)?.is_none());
    Ok(())
  }

  #[test]
  fn test_bidirectional_parsimony_keeps_co_optimal_edges() -> Result<(), Report> {
    let edges = root_edges(&[("A", "AC"), ("B", "A-")], IndelCaller::Parsimony)?;
    assert_eq!(
      vec![
        ((-1, 0), EdgeStatus::Reciprocated),
        ((0, 1), EdgeStatus::Reciprocated),
        ((0, 2), EdgeStatus::Reciprocated),
        ((1, 2), EdgeStatus::Reciprocated),
      ],
      edges
    );
    Ok(())
  }

  #[test]
  fn test_bidirectional_max_likelihood_prefers_real_edge_over_null_on_tie() -> Result<(), Report> {
    // Forward from 1 is a tie between 1->2 and "no edge": the edge wins. Backward from end is a tie between 0->2
    // and 1->2: the lower source wins.
    let edges = root_edges(&[("A", "AC"), ("B", "A-")], IndelCaller::MaxLikelihood)?;
    assert_eq!(
      vec![
        ((-1, 0), EdgeStatus::Reciprocated),
        ((0, 1), EdgeStatus::Reciprocated),
        ((0, 2), EdgeStatus::Backward),
        ((1, 2), EdgeStatus::Forward),
      ],
      edges
    );
    Ok(())
  }

  #[rstest]
  #[case(IndelCaller::Parsimony)]
  #[case(IndelCaller::MaxLikelihood)]
  fn test_bidirectional_majority_absence_drops_position(#[case] caller: IndelCaller) -> Result<(), Report> {
    let edges = root_edges(&[("A", "A-C"), ("B", "A-C"), ("C", "AGC")], caller)?;
    let keys = edges.into_iter().map(|(key, _)| key).collect_vec();
    assert_eq!(vec![(-1, 0), (0, 2), (2, 3)], keys);
    Ok(())
  }
}
