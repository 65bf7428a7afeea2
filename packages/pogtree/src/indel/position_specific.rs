use crate::domain::Domain;
use crate::indel::predict::{IndelCaller, IndelContext};
use crate::parsimony::optimal_set::OptimalSet;
use crate::pog::edge::EdgeStatus;
use crate::pog::pog::{Pog, Position, START};
use eyre::Report;
use itertools::Itertools;
use std::collections::BTreeMap;

/// Whether an ancestor has a residue at an alignment position
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Presence {
  Required,
  Ambiguous,
  Absent,
}

impl Presence {
  pub fn from_call(call: Option<&OptimalSet<bool>>) -> Self {
    match call {
      Some(set) if set.contains(&true) && set.contains(&false) => Presence::Ambiguous,
      Some(set) if set.contains(&true) => Presence::Required,
      _ => Presence::Absent,
    }
  }
}

/// Calls character/gap independently for every column, then links each required position to all admissible
/// positions up to and including the next required one.
pub fn infer(ctx: &IndelContext, caller: IndelCaller) -> Result<BTreeMap<usize, Pog>, Report> {
  let domain = Domain::new([true, false]);
  let instances = (0..ctx.width)
    .map(|col| ctx.leaf_instance(&domain, |pog| Some(pog.is_node(col as Position))))
    .collect::<Result<Vec<_>, Report>>()?;

  let calls = ctx.call_ancestors(instances, caller, None)?;

  ctx
    .empty_ancestor_pogs()
    .into_iter()
    .map(|(anc, pog)| {
      let presence = calls.iter().map(|call| Presence::from_call(call.get(&anc))).collect_vec();
      Ok((anc, assemble(pog, &presence)?))
    })
    .collect()
}

/// Connects every anchor set. An anchor set is a required position (start counts as required) together with the
/// admissible positions following it, up to and including the next required position (end counts as required).
pub fn assemble(mut pog: Pog, presence: &[Presence]) -> Result<Pog, Report> {
  for (pos, p) in presence.iter().enumerate() {
    if *p != Presence::Absent {
      pog.add_node(pos)?;
    }
  }

  let end = presence.len() as Position;
  let mut anchor = START;
  while anchor != end {
    let mut members = vec![];
    let mut next_anchor = end;
    for pos in (anchor + 1)..end {
      match presence[pos as usize] {
        Presence::Required => {
          next_anchor = pos;
          break;
        }
        Presence::Ambiguous => members.push(pos),
        Presence::Absent => {}
      }
    }
    members.push(next_anchor);

    for (i, &member) in members.iter().enumerate() {
      pog.add_edge(anchor, member, EdgeStatus::Reciprocated)?;
      for &later in &members[i + 1..] {
        pog.add_edge(member, later, EdgeStatus::Reciprocated)?;
      }
    }
    anchor = next_anchor;
  }

  Ok(pog)
}
