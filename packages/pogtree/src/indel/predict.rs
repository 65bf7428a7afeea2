use crate::decor::decoration::Decorator;
use crate::decor::joint::JointDecorator;
use crate::domain::{Domain, Symbol};
use crate::indel::{bidirectional, position_specific, repair, simple_indel_coding};
use crate::model::f81::F81;
use crate::network::tree_network::TreeNetwork;
use crate::parsimony::optimal_set::OptimalSet;
use crate::parsimony::parsimony::ParsimonyDecorator;
use crate::pog::pog::Pog;
use crate::reconstruction::params::ReconstructionParams;
use crate::scheduler::decoration_pool::{DecorationPool, DecorationTask};
use crate::tree::indexed_tree::IndexedTree;
use crate::tree::tree_instance::TreeInstance;
use crate::make_internal_report;
use eyre::{Report, WrapErr};
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// How independent local indel calls are obtained
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndelCaller {
  /// Co-optimal sets of maximum parsimony
  Parsimony,
  /// Joint maximum likelihood under a uniform F81 model over the call's domain
  MaxLikelihood,
}

/// Strategy for assembling ancestor POGs from local indel calls
#[derive(Copy, Clone, Debug, PartialEq, Eq, SmartDefault, Serialize, Deserialize)]
pub enum IndelMethod {
  /// Position-specific presence calls by parsimony
  #[serde(rename = "PSP")]
  PositionSpecificParsimony,
  /// Position-specific presence calls by maximum likelihood
  #[serde(rename = "PSML")]
  PositionSpecificMaxLikelihood,
  /// Simple indel coding by parsimony
  #[serde(rename = "SICP")]
  SimpleIndelCodingParsimony,
  /// Simple indel coding by maximum likelihood
  #[serde(rename = "SICML")]
  SimpleIndelCodingMaxLikelihood,
  /// Bidirectional edge calls by parsimony
  #[default]
  #[serde(rename = "BEP")]
  BidirectionalEdgeParsimony,
  /// Bidirectional edge calls by maximum likelihood
  #[serde(rename = "BEML")]
  BidirectionalEdgeMaxLikelihood,
}

impl IndelMethod {
  pub const fn caller(self) -> IndelCaller {
    match self {
      IndelMethod::PositionSpecificParsimony
      | IndelMethod::SimpleIndelCodingParsimony
      | IndelMethod::BidirectionalEdgeParsimony => IndelCaller::Parsimony,
      IndelMethod::PositionSpecificMaxLikelihood
      | IndelMethod::SimpleIndelCodingMaxLikelihood
      | IndelMethod::BidirectionalEdgeMaxLikelihood => IndelCaller::MaxLikelihood,
    }
  }
}

impl Display for IndelMethod {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      IndelMethod::PositionSpecificParsimony => "PSP",
      IndelMethod::PositionSpecificMaxLikelihood => "PSML",
      IndelMethod::SimpleIndelCodingParsimony => "SICP",
      IndelMethod::SimpleIndelCodingMaxLikelihood => "SICML",
      IndelMethod::BidirectionalEdgeParsimony => "BEP",
      IndelMethod::BidirectionalEdgeMaxLikelihood => "BEML",
    };
    write!(f, "{s}")
  }
}

/// Inputs shared by all indel strategies
pub struct IndelContext<'a> {
  pub tree: &'a Arc<IndexedTree>,
  /// Extant POGs, keyed by leaf index
  pub extants: &'a BTreeMap<usize, Pog>,
  pub width: usize,
  pub pool: &'a DecorationPool,
}

impl<'a> IndelContext<'a> {
  /// Instance with the given value at every leaf having an extant POG, and nothing observed elsewhere
  pub(crate) fn leaf_instance<S: Symbol>(
    &self,
    domain: &Domain<S>,
    value: impl Fn(&Pog) -> Option<S>,
  ) -> Result<TreeInstance<S>, Report> {
    let values = self
      .tree
      .iter_preorder()
      .map(|idx| self.extants.get(&idx).and_then(&value))
      .collect_vec();
    TreeInstance::with_values(Arc::clone(self.tree), domain.clone(), values)
  }

  /// Infers the symbols supported at every ancestor, for each of the instances independently.
  ///
  /// Instances where every leaf is observed with the same value are resolved without inference. `null` is never
  /// part of the returned sets.
  pub(crate) fn call_ancestors<S: Symbol>(
    &self,
    instances: Vec<TreeInstance<S>>,
    caller: IndelCaller,
    null: Option<S>,
  ) -> Result<Vec<BTreeMap<usize, OptimalSet<S>>>, Report> {
    let ancestors = self.tree.ancestors();
    let n_instances = instances.len();
    let mut unanimous = BTreeMap::new();

    let tasks = instances
      .into_iter()
      .enumerate()
      .map(|(i, instance)| {
        if let Some(value) = instance.unanimous_leaf_value() {
          unanimous.insert(i, value);
          return Ok(None);
        }
        let decorator = self.make_decorator(&instance, caller, null)?;
        Ok(Some(DecorationTask::new(instance, decorator, ancestors.clone())))
      })
      .collect::<Result<Vec<_>, Report>>()?;

    debug!(
      "Indel calls: {} of {n_instances} are unanimous, running inference for the rest",
      unanimous.len()
    );

    let mut results = self.pool.run(tasks)?;

    (0..n_instances)
      .map(|i| {
        if let Some(&value) = unanimous.get(&i) {
          let set = if Some(value) == null {
            OptimalSet::new()
          } else {
            OptimalSet::from_symbol(value)
          };
          return Ok(ancestors.iter().map(|&anc| (anc, set.clone())).collect());
        }
        let decorations = results
          .remove(&i)
          .ok_or_else(|| make_internal_report!("Indel call #{i} is missing from the results"))?;
        decorations
          .into_iter()
          .map(|(anc, decoration)| Ok((anc, decoration.supported_symbols(null)?)))
          .collect::<Result<BTreeMap<_, _>, Report>>()
      })
      .collect()
  }

  fn make_decorator<S: Symbol>(
    &self,
    instance: &TreeInstance<S>,
    caller: IndelCaller,
    null: Option<S>,
  ) -> Result<Box<dyn Decorator<S>>, Report> {
    Ok(match caller {
      IndelCaller::Parsimony => Box::new(ParsimonyDecorator::new(Arc::clone(self.tree), null)),
      IndelCaller::MaxLikelihood => {
        let model = F81::uniform(instance.domain().clone(), 1.0)?;
        let network = TreeNetwork::build(self.tree, &model, 1.0)?;
        Box::new(JointDecorator::new(Arc::new(network)))
      }
    })
  }

  pub(crate) fn empty_ancestor_pogs(&self) -> BTreeMap<usize, Pog> {
    self
      .tree
      .ancestors()
      .into_iter()
      .map(|anc| (anc, Pog::new(self.tree.label(anc), self.width)))
      .collect()
  }
}

/// Builds one POG per ancestor with the configured strategy, then restores contiguity and optionally nibbles.
pub fn infer_ancestor_pogs(
  ctx: &IndelContext,
  params: &ReconstructionParams,
) -> Result<BTreeMap<usize, Pog>, Report> {
  let method = params.indel_method;
  let caller = method.caller();
  info!(
    "Inferring indels of {} ancestors over {} positions using {method}",
    ctx.tree.ancestors().len(),
    ctx.width
  );

  let mut pogs = match method {
    IndelMethod::PositionSpecificParsimony | IndelMethod::PositionSpecificMaxLikelihood => {
      position_specific::infer(ctx, caller)
    }
    IndelMethod::SimpleIndelCodingParsimony | IndelMethod::SimpleIndelCodingMaxLikelihood => {
      simple_indel_coding::infer(ctx, caller, params.readmit_ambiguous)
    }
    IndelMethod::BidirectionalEdgeParsimony | IndelMethod::BidirectionalEdgeMaxLikelihood => {
      bidirectional::infer(ctx, caller)
    }
  }
  .wrap_err_with(|| format!("When inferring indels using {method}"))?;

  repair::repair_all(ctx, &mut pogs, params.repair_max_iterations)?;

  if params.nibble {
    for pog in pogs.values_mut() {
      let removed = pog.nibble()?;
      if !removed.is_empty() {
        debug!("Nibbled {} positions off ancestor '{}': {removed:?}", removed.len(), pog.name());
      }
    }
  }

  Ok(pogs)
}
