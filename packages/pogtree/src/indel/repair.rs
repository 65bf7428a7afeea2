use crate::indel::bidirectional::{edge_instance, Direction, EdgeTarget};
use crate::indel::predict::{IndelCaller, IndelContext};
use crate::make_internal_report;
use crate::parsimony::optimal_set::OptimalSet;
use crate::pog::pog::{Pog, Position};
use crate::utils::error::AsrError;
use eyre::{Report, WrapErr};
use itertools::Itertools;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

/// Dangling end of a POG: a position and the direction in which it has no edges
type DanglingEnd = (Direction, Position);

/// Edges supported by parsimony with "no edge" excluded, per dangling end and ancestor. Computed once per dangling
/// end, on demand.
#[derive(Default)]
struct EdgeCalls {
  calls: BTreeMap<DanglingEnd, BTreeMap<usize, OptimalSet<EdgeTarget>>>,
}

impl EdgeCalls {
  fn fetch<'a>(&mut self, ctx: &IndelContext, ends: impl IntoIterator<Item = &'a DanglingEnd>) -> Result<(), Report> {
    let missing = ends
      .into_iter()
      .copied()
      .filter(|end| !self.calls.contains_key(end))
      .collect::<BTreeSet<_>>();
    if missing.is_empty() {
      return Ok(());
    }

    let mut keys = vec![];
    let mut instances = vec![];
    for (direction, pos) in missing {
      match edge_instance(ctx, pos, direction, false)? {
        Some(instance) => {
          keys.push((direction, pos));
          instances.push(instance);
        }
        None => {
          self.calls.insert((direction, pos), BTreeMap::new());
        }
      }
    }

    debug!("Repair: inferring edges of {} dangling ends", keys.len());
    let calls = ctx.call_ancestors(instances, IndelCaller::Parsimony, None)?;
    self.calls.extend(keys.into_iter().zip(calls));
    Ok(())
  }

  fn get(&self, end: &DanglingEnd, anc: usize) -> Result<Option<&OptimalSet<EdgeTarget>>, Report> {
    self
      .calls
      .get(end)
      .map(|call| call.get(&anc))
      .ok_or_else(|| make_internal_report!("Repair: edges of dangling end {end:?} were not inferred"))
  }
}

fn dangling_ends(pog: &Pog) -> Vec<DanglingEnd> {
  let mut ends = vec![];
  for pos in pog.protruding_nodes() {
    if pog.lacks_exit(pos) {
      ends.push((Direction::Forward, pos));
    }
    if pog.lacks_entry(pos) {
      ends.push((Direction::Backward, pos));
    }
  }
  ends
}

fn repair_failed(pog: &Pog, reason: impl Into<String>) -> Report {
  Report::new(AsrError::RepairFailed {
    ancestor: pog.name().to_owned(),
    reason: reason.into(),
  })
}

/// Restores contiguity of ancestor POGs which have no path from start to end.
///
/// Every dangling end is continued with the edges parsimony supports in its direction, ignoring sequences which
/// lack the position, and this repeats until no dangling ends remain. Edges are only ever added, so the process
/// ends. Still, if an iteration adds nothing to a non-contiguous POG, or `max_iterations` is exhausted, the repair
/// fails with `RepairFailed`.
pub fn repair_all(ctx: &IndelContext, pogs: &mut BTreeMap<usize, Pog>, max_iterations: usize) -> Result<(), Report> {
  let mut pending = pogs
    .iter()
    .filter(|(_, pog)| !pog.is_contiguous())
    .map(|(&anc, _)| anc)
    .collect::<BTreeSet<_>>();
  if pending.is_empty() {
    return Ok(());
  }
  info!("Repairing {} non-contiguous ancestor POGs", pending.len());

  let mut calls = EdgeCalls::default();
  let mut iteration = 0;
  while !pending.is_empty() {
    if iteration == max_iterations {
      return match pending.iter().map(|anc| &pogs[anc]).find(|pog| !pog.is_contiguous()) {
        Some(pog) => Err(repair_failed(pog, format!("no path after {max_iterations} iterations"))),
        None => {
          debug!("Repair: stopping after {max_iterations} iterations, all POGs are contiguous");
          Ok(())
        }
      };
    }

    let dangling = pending
      .iter()
      .map(|&anc| (anc, dangling_ends(&pogs[&anc])))
      .collect_vec();
    calls
      .fetch(ctx, dangling.iter().flat_map(|(_, ends)| ends))
      .wrap_err_with(|| format!("When repairing ancestor POGs, iteration {iteration}"))?;

    let mut still_pending = BTreeSet::new();
    for (anc, ends) in dangling {
      let pog = pogs
        .get_mut(&anc)
        .ok_or_else(|| make_internal_report!("Repair: ancestor POG #{anc} disappeared"))?;

      let mut n_added = 0;
      for end in &ends {
        let (direction, pos) = *end;
        let Some(targets) = calls.get(end, anc)? else {
          continue;
        };
        for target in targets.iter() {
          if let EdgeTarget::Pos(neighbor) = target {
            let (from, to) = direction.edge(pos, neighbor);
            if !pog.has_edge(from, to) {
              pog.force_edge(from, to, direction.status())?;
              n_added += 1;
            }
          }
        }
      }

      if pog.protruding_nodes().is_empty() {
        debug!("Repair: ancestor '{}' repaired after {} iterations", pog.name(), iteration + 1);
        continue;
      }
      if n_added == 0 {
        if pog.is_contiguous() {
          debug!(
            "Repair: ancestor '{}' is contiguous, leaving {} dangling ends in place",
            pog.name(),
            ends.len()
          );
          continue;
        }
        return Err(repair_failed(pog, "no edges could be added to its dangling ends"));
      }
      still_pending.insert(anc);
    }

    pending = still_pending;
    iteration += 1;
  }

  Ok(())
}
