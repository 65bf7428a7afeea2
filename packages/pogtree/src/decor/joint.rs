use crate::decor::decoration::{Decoration, Decorator};
use crate::domain::Symbol;
use crate::inference::engine::{Assignment, InferenceEngine};
use crate::inference::tree_elimination::TreeElimination;
use crate::make_error;
use crate::network::tree_network::TreeNetwork;
use crate::tree::tree_instance::TreeInstance;
use eyre::Report;
use std::sync::Arc;

/// Decorates every branch point with its value in the jointly most probable assignment
#[derive(Clone, Debug)]
pub struct JointDecorator<S: Symbol> {
  engine: TreeElimination<S>,
  assignment: Option<Assignment<S>>,
}

impl<S: Symbol> JointDecorator<S> {
  pub fn new(network: Arc<TreeNetwork<S>>) -> Self {
    Self {
      engine: TreeElimination::instantiate(network),
      assignment: None,
    }
  }

  pub fn assignment(&self) -> Option<&Assignment<S>> {
    self.assignment.as_ref()
  }
}

/// Transfers observations of the instance into the engine, clearing any earlier evidence
pub(crate) fn assign_evidence<S: Symbol>(
  engine: &mut impl InferenceEngine<S>,
  instance: &TreeInstance<S>,
) -> Result<(), Report> {
  instance.check_bound_to(engine.network().tree())?;
  engine.reset_evidence();
  for (idx, value) in instance.observed() {
    engine.set_evidence(idx, value)?;
  }
  Ok(())
}

impl<S: Symbol> Decorator<S> for JointDecorator<S> {
  fn decorate(&mut self, instance: &TreeInstance<S>) -> Result<(), Report> {
    assign_evidence(&mut self.engine, instance)?;
    self.assignment = Some(self.engine.make_mpe()?);
    Ok(())
  }

  fn get_decoration(&self, idx: usize) -> Result<Decoration<S>, Report> {
    let Some(assignment) = &self.assignment else {
      return make_error!("Joint decoration of branch point #{idx} requested before decorating");
    };
    match assignment.get(idx) {
      Some(value) => Ok(Decoration::Joint(*value)),
      None => make_error!(
        "Branch point #{idx} is out of range of the tree of size {}",
        assignment.len()
      ),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Domain;
  use crate::model::f81::F81;
  use crate::tree::tree_builder::tests::{example_tree, star_tree};
  use crate::tree::tree_builder::TreeBuilder;
  use crate::utils::error::{find_asr_error, AsrError};
  use pretty_assertions::assert_eq;

  fn network(tree: &Arc<crate::tree::indexed_tree::IndexedTree>) -> Result<Arc<TreeNetwork<char>>, Report> {
    let model = F81::uniform(Domain::new(['A', 'C', 'G', 'T']), 1.0)?;
    Ok(Arc::new(TreeNetwork::build(tree, &model, 1.0)?))
  }

  #[test]
  fn test_joint_decoration_of_parent_equals_observed_child() -> Result<(), Report> {
    let mut builder = TreeBuilder::new();
    let parent = builder.add_node("parent", 0.0);
    let child = builder.add_node("child", 0.01);
    builder.add_edge(parent, child)?;
    let tree = Arc::new(builder.build()?);

    let mut instance = TreeInstance::new(Arc::clone(&tree), Domain::new(['A', 'C', 'G', 'T']));
    instance.set(1, Some('C'))?;

    let mut decorator = JointDecorator::new(network(&tree)?);
    decorator.decorate(&instance)?;
    assert_eq!(Decoration::Joint('C'), decorator.get_decoration(0)?);
    assert_eq!(Decoration::Joint('C'), decorator.get_decoration(1)?);
    Ok(())
  }

  #[test]
  fn test_joint_decorator_is_reusable_with_new_evidence() -> Result<(), Report> {
    let tree = Arc::new(example_tree()?);
    let domain = Domain::new(['A', 'C', 'G', 'T']);
    let mut decorator = JointDecorator::new(network(&tree)?);

    let first = TreeInstance::with_values(
      Arc::clone(&tree),
      domain.clone(),
      vec![None, None, Some('A'), Some('A'), None, Some('A'), Some('A')],
    )?;
    decorator.decorate(&first)?;
    assert_eq!(Some(&vec!['A'; 7]), decorator.assignment());

    let second = TreeInstance::with_values(
      Arc::clone(&tree),
      domain,
      vec![None, None, Some('G'), Some('G'), None, Some('G'), Some('T')],
    )?;
    decorator.decorate(&second)?;
    assert_eq!(Decoration::Joint('G'), decorator.get_decoration(0)?);
    assert_eq!(Decoration::Joint('T'), decorator.get_decoration(6)?);
    Ok(())
  }

  #[test]
  fn test_joint_decorator_rejects_foreign_tree() -> Result<(), Report> {
    let tree = Arc::new(star_tree(&["a", "b"])?);
    let other = Arc::new(star_tree(&["a", "b"])?);
    let instance = TreeInstance::new(other, Domain::new(['A', 'C', 'G', 'T']));
    let mut decorator = JointDecorator::new(network(&tree)?);
    let report = decorator.decorate(&instance).unwrap_err();
    assert_eq!(Some(&AsrError::InvalidTopology), find_asr_error(&report));
    Ok(())
  }

  #[test]
  fn test_joint_decoration_before_decorate_is_an_error() -> Result<(), Report> {
    let tree = Arc::new(star_tree(&["a"])?);
    let decorator = JointDecorator::new(network(&tree)?);
    assert!(decorator.get_decoration(0).is_err());
    Ok(())
  }
}
