use crate::domain::Domain;
use crate::indel::interval::{collect_intervals, Interval};
use crate::indel::predict::{IndelCaller, IndelContext};
use crate::pog::edge::EdgeStatus;
use crate::pog::pog::{Pog, Position, START};
use eyre::Report;
use itertools::Itertools;
use log::trace;
use std::collections::BTreeMap;

/// Indel intervals of one ancestor, by how confidently the ancestor makes the jump
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntervalCalls {
  /// Jumps made by the ancestor in every optimal reconstruction, sorted by start, then end
  pub unambiguous: Vec<Interval>,
  /// Jumps made in some optimal reconstructions only
  pub ambiguous: Vec<Interval>,
}

/// Treats every jump edge observed in an extant sequence as a binary character, infers it independently for every
/// ancestor, and sweeps the confirmed jumps left to right, linking what lies between them.
pub fn infer(ctx: &IndelContext, caller: IndelCaller, readmit_ambiguous: bool) -> Result<BTreeMap<usize, Pog>, Report> {
  let intervals = collect_intervals(ctx.extants.values()).into_iter().collect_vec();
  let domain = Domain::new([true, false]);
  let instances = intervals
    .iter()
    .map(|interval| ctx.leaf_instance(&domain, |pog| interval.code(pog)))
    .collect::<Result<Vec<_>, Report>>()?;

  let calls = ctx.call_ancestors(instances, caller, None)?;

  ctx
    .empty_ancestor_pogs()
    .into_iter()
    .map(|(anc, pog)| {
      let mut ancestor_calls = IntervalCalls::default();
      for (interval, call) in intervals.iter().zip(&calls) {
        match call.get(&anc) {
          Some(set) if set.contains(&true) && set.contains(&false) => ancestor_calls.ambiguous.push(*interval),
          Some(set) if set.contains(&true) => ancestor_calls.unambiguous.push(*interval),
          _ => {}
        }
      }
      Ok((anc, assemble(pog, &ancestor_calls, readmit_ambiguous)?))
    })
    .collect()
}

/// Chains `from -> from+1 -> ... -> to`
fn link(pog: &mut Pog, from: Position, to: Position) -> Result<(), Report> {
  for pos in from..to {
    pog.force_edge(pos, pos + 1, EdgeStatus::Reciprocated)?;
  }
  Ok(())
}

pub fn assemble(mut pog: Pog, calls: &IntervalCalls, readmit_ambiguous: bool) -> Result<Pog, Report> {
  let end = pog.end();
  let mut accepted: Vec<Interval> = vec![];
  let mut cursor = START;

  for interval in calls.unambiguous.iter().sorted() {
    if let Some(previous) = accepted.last() {
      if previous.contains(interval) {
        trace!("Ancestor '{}': interval {interval} is within {previous}, skipping", pog.name());
        continue;
      }
    }
    link(&mut pog, cursor, interval.from)?;
    pog.force_edge(interval.from, interval.to, EdgeStatus::Reciprocated)?;
    cursor = cursor.max(interval.to);
    accepted.push(*interval);
  }
  link(&mut pog, cursor, end)?;

  if readmit_ambiguous {
    for interval in &calls.ambiguous {
      let endpoints_present = pog.is_node(interval.from) && pog.is_node(interval.to);
      let subsumed = accepted.iter().any(|a| a.contains(interval));
      if endpoints_present && !subsumed {
        trace!("Ancestor '{}': readmitting ambiguous interval {interval}", pog.name());
        pog.add_edge(interval.from, interval.to, EdgeStatus::Reciprocated)?;
      }
    }
  }

  Ok(pog)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  fn edges(pog: &Pog) -> Vec<(Position, Position)> {
    pog.edges().map(|(key, _)| key).collect_vec()
  }

  fn calls(unambiguous: &[(Position, Position)], ambiguous: &[(Position, Position)]) -> IntervalCalls {
    let to_intervals = |v: &[(Position, Position)]| v.iter().map(|&(from, to)| Interval::new(from, to)).collect_vec();
    IntervalCalls {
      unambiguous: to_intervals(unambiguous),
      ambiguous: to_intervals(ambiguous),
    }
  }

  #[test]
  fn test_sic_without_intervals_is_linear() -> Result<(), Report> {
    let pog = assemble(Pog::new("anc", 3), &calls(&[], &[]), false)?;
    assert_eq!(vec![(-1, 0), (0, 1), (1, 2), (2, 3)], edges(&pog));
    Ok(())
  }

  #[test]
  fn test_sic_links_between_accepted_intervals() -> Result<(), Report> {
    // 0 -> 3 skips 1, 2; 4 -> 6 skips 5
    let pog = assemble(Pog::new("anc", 6), &calls(&[(4, 6), (0, 3)], &[]), false)?;
    assert_eq!(vec![0, 3, 4], pog.nodes().collect_vec());
    assert_eq!(vec![(-1, 0), (0, 3), (3, 4), (4, 6)], edges(&pog));
    assert!(pog.is_contiguous());
    Ok(())
  }

  #[test]
  fn test_sic_discards_interval_within_previous() -> Result<(), Report> {
    let pog = assemble(Pog::new("anc", 6), &calls(&[(0, 5), (1, 3)], &[]), false)?;
    assert_eq!(vec![(-1, 0), (0, 5), (5, 6)], edges(&pog));
    Ok(())
  }

  #[rstest]
  #[case(false, vec![(-1, 0), (0, 1), (1, 2), (2, 3)])]
  #[case(true, vec![(-1, 0), (-1, 1), (0, 1), (0, 2), (1, 2), (2, 3)])]
  fn test_sic_readmits_ambiguous_intervals(
    #[case] readmit: bool,
    #[case] expected: Vec<(Position, Position)>,
  ) -> Result<(), Report> {
    let pog = assemble(Pog::new("anc", 3), &calls(&[], &[(-1, 1), (0, 2), (0, 5)]), readmit)?;
    assert_eq!(expected, edges(&pog));
    Ok(())
  }

  #[test]
  fn test_sic_does_not_readmit_subsumed_interval() -> Result<(), Report> {
    let pog = assemble(Pog::new("anc", 5), &calls(&[(0, 4)], &[(1, 3)]), true)?;
    assert_eq!(vec![(-1, 0), (0, 4), (4, 5)], edges(&pog));
    Ok(())
  }
}
