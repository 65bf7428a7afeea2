use crate::decor::decoration::{Decoration, Decorator};
use crate::decor::joint::assign_evidence;
use crate::domain::Symbol;
use crate::inference::engine::{Distribution, InferenceEngine};
use crate::inference::tree_elimination::TreeElimination;
use crate::make_error;
use crate::network::tree_network::TreeNetwork;
use crate::tree::tree_instance::TreeInstance;
use crate::utils::error::AsrError;
use eyre::Report;
use std::sync::Arc;

/// Decorates one nominated branch point with its marginal posterior distribution
#[derive(Clone, Debug)]
pub struct MarginalDecorator<S: Symbol> {
  engine: TreeElimination<S>,
  target: usize,
  distribution: Option<Distribution<S>>,
}

impl<S: Symbol> MarginalDecorator<S> {
  pub fn new(network: Arc<TreeNetwork<S>>, target: usize) -> Result<Self, Report> {
    let size = network.tree().size();
    if target >= size {
      return make_error!("Marginal target #{target} is out of range of the tree of size {size}");
    }
    Ok(Self {
      engine: TreeElimination::instantiate(network),
      target,
      distribution: None,
    })
  }

  pub fn target(&self) -> usize {
    self.target
  }
}

impl<S: Symbol> Decorator<S> for MarginalDecorator<S> {
  fn decorate(&mut self, instance: &TreeInstance<S>) -> Result<(), Report> {
    assign_evidence(&mut self.engine, instance)?;
    self.distribution = Some(self.engine.make_query(self.target)?);
    Ok(())
  }

  fn get_decoration(&self, idx: usize) -> Result<Decoration<S>, Report> {
    if idx != self.target {
      return Err(Report::new(AsrError::InvalidQuery {
        requested: idx,
        nominated: self.target,
      }));
    }
    match &self.distribution {
      Some(dis) => Ok(Decoration::Marginal(dis.clone())),
      None => make_error!("Marginal decoration of branch point #{idx} requested before decorating"),
    }
  }
}
