use crate::alignment::alignment::Alignment;
use crate::decor::decoration::Decorator;
use crate::decor::joint::JointDecorator;
use crate::decor::marginal::MarginalDecorator;
use crate::indel::predict::{infer_ancestor_pogs, IndelContext};
use crate::inference::engine::Distribution;
use crate::model::subst_model::SubstModel;
use crate::network::tree_network::TreeNetwork;
use crate::pog::pog::Pog;
use crate::reconstruction::params::ReconstructionParams;
use crate::scheduler::decoration_pool::{DecorationPool, DecorationTask};
use crate::tree::indexed_tree::IndexedTree;
use crate::tree::tree_instance::TreeInstance;
use crate::utils::error::AsrError;
use crate::{make_error, make_internal_report};
use eyre::{Report, WrapErr};
use itertools::Itertools;
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Character emitted for a position on the consensus path which has no inferred state
pub const UNRESOLVED_CHAR: char = '?';

pub const GAP_CHAR: char = '-';

/// Source of the characters of a consensus sequence
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusMode {
  /// States of the jointly most probable assignment
  Joint,
  /// Most probable states of the marginal distributions of the ancestor
  Marginal,
}

/// Ancestral reconstruction over one tree and one alignment of its leaves.
///
/// Ancestor POGs, joint states and marginal distributions are computed on request and kept for later queries.
pub struct Reconstruction {
  tree: Arc<IndexedTree>,
  alignment: Alignment,
  params: ReconstructionParams,
  pool: DecorationPool,
  /// Extant POGs, keyed by leaf index
  extants: BTreeMap<usize, Pog>,
  /// Ancestor POGs, keyed by ancestor index
  ancestors: Option<BTreeMap<usize, Pog>>,
  /// Joint state of every ancestor at every column
  joint: Option<BTreeMap<usize, Vec<Option<char>>>>,
  /// Marginal distribution at every column, per ancestor
  marginals: BTreeMap<usize, Vec<Option<Distribution<char>>>>,
}

impl Reconstruction {
  pub fn new(tree: Arc<IndexedTree>, alignment: Alignment, params: ReconstructionParams) -> Result<Self, Report> {
    let extants = tree
      .leaves()
      .into_iter()
      .map(|leaf| {
        let label = tree.label(leaf);
        if !alignment.contains(label) {
          return make_error!("Leaf '{label}' of the tree has no sequence in the alignment");
        }
        Ok((leaf, alignment.extant_pog(label)?))
      })
      .collect::<Result<BTreeMap<_, _>, Report>>()?;

    let unused = alignment
      .names()
      .iter()
      .filter(|name| tree.find_label(name).map_or(true, |idx| !tree.is_leaf(idx)))
      .collect_vec();
    if !unused.is_empty() {
      warn!(
        "{} sequences of the alignment are not leaves of the tree and will be ignored: {}",
        unused.len(),
        unused.iter().join(", ")
      );
    }

    let pool = DecorationPool::new(params.jobs)?;
    info!(
      "Reconstruction of {} ancestors from {} sequences of length {}, using {} threads",
      tree.ancestors().len(),
      extants.len(),
      alignment.width(),
      pool.num_threads()
    );

    Ok(Self {
      tree,
      alignment,
      params,
      pool,
      extants,
      ancestors: None,
      joint: None,
      marginals: BTreeMap::new(),
    })
  }

  pub fn tree(&self) -> &Arc<IndexedTree> {
    &self.tree
  }

  pub fn params(&self) -> &ReconstructionParams {
    &self.params
  }

  fn indel_context(&self) -> IndelContext {
    IndelContext {
      tree: &self.tree,
      extants: &self.extants,
      width: self.alignment.width(),
      pool: &self.pool,
    }
  }

  /// Builds the POG of every ancestor with the configured indel method, replacing any built before
  pub fn infer_indels(&mut self) -> Result<&BTreeMap<usize, Pog>, Report> {
    let pogs = infer_ancestor_pogs(&self.indel_context(), &self.params)?;
    Ok(self.ancestors.insert(pogs))
  }

  /// Index of the ancestor with the given label
  pub fn ancestor_index(&self, ancestor: &str) -> Result<usize, Report> {
    match self.tree.find_label(ancestor) {
      Some(idx) if !self.tree.is_leaf(idx) => Ok(idx),
      _ => Err(Report::new(AsrError::UnknownAncestor(ancestor.to_owned()))),
    }
  }

  pub fn ancestor_pog(&self, ancestor: &str) -> Result<&Pog, Report> {
    let idx = self.ancestor_index(ancestor)?;
    let Some(ancestors) = &self.ancestors else {
      return make_error!("Ancestor POGs are not available: indels have not been inferred yet");
    };
    ancestors
      .get(&idx)
      .ok_or_else(|| make_internal_report!("POG of ancestor '{ancestor}' is missing"))
  }

  fn check_rates(&self, rates: Option<&[f64]>) -> Result<(), Report> {
    match rates {
      Some(rates) if rates.len() != self.alignment.width() => make_error!(
        "Expected one relative rate per alignment column ({}), but got {}",
        self.alignment.width(),
        rates.len()
      ),
      _ => Ok(()),
    }
  }

  /// Observations of one column: residues at the leaves, where they are part of the model's domain
  fn column_instance(&self, model: &dyn SubstModel<char>, column: usize) -> Result<TreeInstance<char>, Report> {
    let domain = model.domain();
    let values = self
      .tree
      .iter_preorder()
      .map(|idx| {
        if !self.tree.is_leaf(idx) {
          return None;
        }
        self
          .alignment
          .residue(self.tree.label(idx), column)
          .filter(|residue| domain.contains(residue))
      })
      .collect_vec();
    TreeInstance::with_values(Arc::clone(&self.tree), domain.clone(), values)
  }

  /// One inference network per distinct rate, built on first use
  fn network_for<'a>(
    &self,
    networks: &'a mut BTreeMap<OrderedFloat<f64>, Arc<TreeNetwork<char>>>,
    model: &dyn SubstModel<char>,
    rate: f64,
  ) -> Result<&'a Arc<TreeNetwork<char>>, Report> {
    let network: &'a Arc<TreeNetwork<char>> = match networks.entry(OrderedFloat(rate)) {
      Entry::Occupied(entry) => entry.into_mut(),
      Entry::Vacant(entry) => entry.insert(Arc::new(TreeNetwork::build(&self.tree, model, rate)?)),
    };
    Ok(network)
  }

  /// Infers the jointly most probable state of every ancestor at every column.
  ///
  /// Columns where all leaves share a residue are resolved to that residue without inference. Columns without any
  /// residue from the model's domain are left unresolved.
  pub fn joint_reconstruct(&mut self, model: &dyn SubstModel<char>, rates: Option<&[f64]>) -> Result<(), Report> {
    self.check_rates(rates)?;
    let width = self.alignment.width();
    let ancestors = self.tree.ancestors();
    let mut networks = BTreeMap::new();
    let mut states: BTreeMap<usize, Vec<Option<char>>> =
      ancestors.iter().map(|&anc| (anc, vec![None; width])).collect();

    let mut tasks = Vec::with_capacity(width);
    let mut n_unanimous = 0;
    for column in 0..width {
      let instance = self.column_instance(model, column)?;
      if let Some(value) = instance.unanimous_leaf_value() {
        for column_states in states.values_mut() {
          column_states[column] = Some(value);
        }
        n_unanimous += 1;
        tasks.push(None);
        continue;
      }
      if instance.observed().next().is_none() {
        tasks.push(None);
        continue;
      }
      let rate = rates.map_or(1.0, |rates| rates[column]);
      let network = self.network_for(&mut networks, model, rate)?;
      let decorator: Box<dyn Decorator<char>> = Box::new(JointDecorator::new(Arc::clone(network)));
      tasks.push(Some(DecorationTask::new(instance, decorator, ancestors.clone())));
    }

    debug!(
      "Joint reconstruction: {n_unanimous} of {width} columns are unanimous, {} inference networks",
      networks.len()
    );

    let results = self.pool.run(tasks).wrap_err("When inferring joint states")?;
    for (column, decorations) in results {
      for (anc, decoration) in decorations {
        let value = decoration
          .as_joint()
          .ok_or_else(|| make_internal_report!("Expected a joint decoration at column {column}"))?;
        if let Some(column_states) = states.get_mut(&anc) {
          column_states[column] = Some(value);
        }
      }
    }

    self.joint = Some(states);
    Ok(())
  }

  /// Joint state of the ancestor at the column. `None` if the column could not be resolved.
  pub fn joint_state(&self, ancestor: &str, column: usize) -> Result<Option<char>, Report> {
    let idx = self.ancestor_index(ancestor)?;
    let Some(joint) = &self.joint else {
      return make_error!("Joint states are not available: joint reconstruction has not been run yet");
    };
    let states = joint
      .get(&idx)
      .ok_or_else(|| make_internal_report!("Joint states of ancestor '{ancestor}' are missing"))?;
    match states.get(column) {
      Some(state) => Ok(*state),
      None => make_error!("Column {column} is out of range of the alignment of width {}", states.len()),
    }
  }

  /// Infers the marginal distribution of the ancestor's state at every column
  pub fn marginal_reconstruct(
    &mut self,
    ancestor: &str,
    model: &dyn SubstModel<char>,
    rates: Option<&[f64]>,
  ) -> Result<(), Report> {
    let target = self.ancestor_index(ancestor)?;
    self.check_rates(rates)?;
    let width = self.alignment.width();
    let mut networks = BTreeMap::new();

    let mut tasks = Vec::with_capacity(width);
    for column in 0..width {
      let instance = self.column_instance(model, column)?;
      if instance.observed().next().is_none() {
        tasks.push(None);
        continue;
      }
      let rate = rates.map_or(1.0, |rates| rates[column]);
      let network = self.network_for(&mut networks, model, rate)?;
      let decorator: Box<dyn Decorator<char>> = Box::new(MarginalDecorator::new(Arc::clone(network), target)?);
      tasks.push(Some(DecorationTask::new(instance, decorator, vec![target])));
    }

    let results = self
      .pool
      .run(tasks)
      .wrap_err_with(|| format!("When inferring marginal distributions of ancestor '{ancestor}'"))?;

    let mut distributions = vec![None; width];
    for (column, mut decorations) in results {
      let distribution = decorations
        .remove(&target)
        .and_then(|decoration| decoration.as_marginal().cloned())
        .ok_or_else(|| make_internal_report!("Expected a marginal decoration at column {column}"))?;
      distributions[column] = Some(distribution);
    }

    self.marginals.insert(target, distributions);
    Ok(())
  }

  /// Marginal distribution of the ancestor at the column. `None` if the column could not be resolved.
  pub fn marginal_distribution(&self, ancestor: &str, column: usize) -> Result<Option<&Distribution<char>>, Report> {
    let idx = self.ancestor_index(ancestor)?;
    let Some(distributions) = self.marginals.get(&idx) else {
      return make_error!(
        "Marginal distributions of ancestor '{ancestor}' are not available: run marginal reconstruction first"
      );
    };
    match distributions.get(column) {
      Some(distribution) => Ok(distribution.as_ref()),
      None => make_error!(
        "Column {column} is out of range of the alignment of width {}",
        distributions.len()
      ),
    }
  }

  /// State of the ancestor at every column, according to the mode
  fn ancestor_states(&self, idx: usize, mode: ConsensusMode) -> Result<Vec<Option<char>>, Report> {
    let label = self.tree.label(idx);
    match mode {
      ConsensusMode::Joint => match &self.joint {
        Some(joint) => joint
          .get(&idx)
          .cloned()
          .ok_or_else(|| make_internal_report!("Joint states of ancestor '{label}' are missing")),
        None => make_error!("Joint states are not available: joint reconstruction has not been run yet"),
      },
      ConsensusMode::Marginal => match self.marginals.get(&idx) {
        Some(distributions) => distributions
          .iter()
          .map(|distribution| distribution.as_ref().map(Distribution::argmax).transpose())
          .collect(),
        None => make_error!(
          "Marginal distributions of ancestor '{label}' are not available: run marginal reconstruction first"
        ),
      },
    }
  }

  /// Sequence of the ancestor along the path of its POG best supported by the extant sequences below it.
  ///
  /// Indels are inferred first if that has not happened yet. With `include_gaps`, columns off the path are written
  /// as gaps, so the result is aligned with the input.
  pub fn consensus_sequence(
    &mut self,
    ancestor: &str,
    mode: ConsensusMode,
    include_gaps: bool,
  ) -> Result<String, Report> {
    let idx = self.ancestor_index(ancestor)?;
    let states = self.ancestor_states(idx, mode)?;
    if self.ancestors.is_none() {
      self.infer_indels()?;
    }

    let support = self
      .tree
      .leaves_below(idx)
      .into_iter()
      .filter_map(|leaf| self.extants.get(&leaf))
      .collect_vec();
    let pog = self
      .ancestors
      .as_mut()
      .and_then(|ancestors| ancestors.get_mut(&idx))
      .ok_or_else(|| make_internal_report!("POG of ancestor '{ancestor}' is missing"))?;
    let path = pog
      .most_supported_path(&support, self.params.path_search)
      .wrap_err_with(|| format!("When searching consensus path of ancestor '{ancestor}'"))?;

    let state_at = |column: usize| states[column].unwrap_or(UNRESOLVED_CHAR);
    let sequence: String = if include_gaps {
      let mut sequence = vec![GAP_CHAR; states.len()];
      for &column in &path {
        sequence[column] = state_at(column);
      }
      sequence.into_iter().collect()
    } else {
      path.iter().map(|&column| state_at(column)).collect()
    };
    Ok(sequence)
  }
}
