use crate::constants::PARSIMONY_INFINITY;
use crate::decor::decoration::{Decoration, Decorator};
use crate::domain::{Domain, Symbol};
use crate::make_error;
use crate::parsimony::optimal_set::OptimalSet;
use crate::tree::indexed_tree::IndexedTree;
use crate::tree::tree_instance::TreeInstance;
use crate::utils::random::random_choice;
use eyre::Report;
use itertools::Itertools;
use log::trace;
use rand::Rng;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Sankoff small parsimony with unit substitution cost, keeping track of every co-optimal state.
///
/// Forward (postorder) pass computes, for every branch point `n` and symbol `i`, the minimum number of changes in
/// the subtree below `n` given `n = i`, and for every child the set of child symbols achieving that minimum. The
/// backward (preorder) pass starts from the set of root symbols with the globally minimal score and, for every
/// chosen parent symbol, admits all child symbols of its traceback entry.
///
/// A branch point whose whole subtree is unobserved is unconstrained and reports the whole domain.
///
/// If a null symbol is given, it marks "nothing here" (e.g. no edge). A branch point for which null is the only
/// optimal symbol reports an empty set.
#[derive(Clone, Debug)]
pub struct Parsimony<S: Symbol> {
  tree: Arc<IndexedTree>,
  domain: Domain<S>,
  null: Option<usize>,
  scores: Vec<Vec<u64>>,
  /// `traceback[child][i]`: optimal symbols of `child` when its parent takes symbol `i`
  traceback: Vec<Vec<Vec<usize>>>,
  informative: Vec<bool>,
  optimal: Vec<BTreeSet<usize>>,
}

impl<S: Symbol> Parsimony<S> {
  pub fn infer(instance: &TreeInstance<S>, null: Option<S>) -> Result<Self, Report> {
    let tree = Arc::clone(instance.tree());
    let domain = instance.domain().clone();
    if domain.is_empty() {
      return make_error!("Parsimony requires a non-empty domain");
    }
    let null = null.map(|s| domain.encode(&s)).transpose()?;

    let observed = tree
      .iter_preorder()
      .map(|idx| instance.encoded(idx))
      .collect::<Result<Vec<_>, Report>>()?;

    let mut this = Self {
      tree,
      domain,
      null,
      scores: vec![],
      traceback: vec![],
      informative: vec![],
      optimal: vec![],
    };
    this.forward(&observed);
    this.backward();
    Ok(this)
  }

  fn forward(&mut self, observed: &[Option<usize>]) {
    let n = self.tree.size();
    let k = self.domain.len();
    self.scores = vec![vec![]; n];
    self.traceback = vec![vec![]; n];
    self.informative = vec![false; n];

    for idx in self.tree.iter_postorder() {
      let mut score = match observed[idx] {
        Some(value) => (0..k).map(|i| if i == value { 0 } else { PARSIMONY_INFINITY }).collect_vec(),
        None => vec![0; k],
      };
      let mut informative = observed[idx].is_some();

      for &child in self.tree.children(idx) {
        informative |= self.informative[child];
        let child_score = &self.scores[child];
        let mut choice = Vec::with_capacity(k);
        for (i, score_i) in score.iter_mut().enumerate() {
          let cost = |j: usize| {
            child_score[j]
              .saturating_add(u64::from(i != j))
              .min(PARSIMONY_INFINITY)
          };
          let best = (0..k).map(cost).min().unwrap_or(PARSIMONY_INFINITY);
          choice.push((0..k).filter(|&j| cost(j) == best).collect_vec());
          *score_i = score_i.saturating_add(best).min(PARSIMONY_INFINITY);
        }
        self.traceback[child] = choice;
      }

      self.informative[idx] = informative;
      self.scores[idx] = score;
    }
  }

  fn backward(&mut self) {
    let n = self.tree.size();
    let k = self.domain.len();
    let root = self.tree.root();
    let mut optimal = vec![BTreeSet::new(); n];

    let best = self.score();
    optimal[root] = if self.informative[root] {
      (0..k).filter(|&i| self.scores[root][i] == best).collect()
    } else {
      (0..k).collect()
    };

    let mut visited = vec![false; n];
    let mut stack = vec![root];
    while let Some(idx) = stack.pop() {
      if visited[idx] {
        continue;
      }
      visited[idx] = true;

      for &child in self.tree.children(idx).iter().rev() {
        optimal[child] = if self.informative[child] {
          optimal[idx]
            .iter()
            .flat_map(|&i| self.traceback[child][i].iter().copied())
            .collect()
        } else {
          (0..k).collect()
        };
        stack.push(child);
      }
    }

    trace!("Parsimony: score {best}, root optimal set {:?}", optimal[root]);
    self.optimal = optimal;
  }

  pub fn domain(&self) -> &Domain<S> {
    &self.domain
  }

  /// Minimum total number of changes over the tree
  pub fn score(&self) -> u64 {
    self.scores[self.tree.root()]
      .iter()
      .copied()
      .min()
      .unwrap_or(PARSIMONY_INFINITY)
  }

  /// Minimum number of changes in the subtree of the branch point, per symbol
  pub fn scores(&self, idx: usize) -> Option<&[u64]> {
    self.scores.get(idx).map(Vec::as_slice)
  }

  /// Co-optimal symbols of the branch point. Empty if null is the only optimal symbol.
  pub fn optimal(&self, idx: usize) -> Result<OptimalSet<S>, Report> {
    let Some(optimal) = self.optimal.get(idx) else {
      return make_error!(
        "Branch point #{idx} is out of range of the tree of size {}",
        self.tree.size()
      );
    };

    if let Some(null) = self.null {
      if optimal.len() == 1 && optimal.contains(&null) {
        return Ok(OptimalSet::new());
      }
    }

    optimal
      .iter()
      .map(|&i| self.domain.decode(i))
      .collect::<Result<OptimalSet<S>, Report>>()
  }

  /// Draws one most parsimonious assignment of all branch points, choosing uniformly among co-optimal symbols.
  ///
  /// Unobserved subtrees inherit the symbol of their parent.
  pub fn sample_solution(&self, rng: &mut impl Rng) -> Result<Vec<S>, Report> {
    let n = self.tree.size();
    let root = self.tree.root();
    let mut states = vec![0; n];
    states[root] = random_choice(self.optimal[root].iter().copied(), rng)?;

    for idx in self.tree.iter_preorder() {
      for &child in self.tree.children(idx) {
        states[child] = if self.informative[child] {
          random_choice(self.traceback[child][states[idx]].iter().copied(), rng)?
        } else {
          states[idx]
        };
      }
    }

    states.into_iter().map(|i| self.domain.decode(i)).collect()
  }
}

/// Decorates every branch point with its set of co-optimal parsimony symbols
#[derive(Clone, Debug)]
pub struct ParsimonyDecorator<S: Symbol> {
  tree: Arc<IndexedTree>,
  null: Option<S>,
  solution: Option<Parsimony<S>>,
}

impl<S: Symbol> ParsimonyDecorator<S> {
  pub fn new(tree: Arc<IndexedTree>, null: Option<S>) -> Self {
    Self {
      tree,
      null,
      solution: None,
    }
  }

  pub fn solution(&self) -> Option<&Parsimony<S>> {
    self.solution.as_ref()
  }
}

impl<S: Symbol> Decorator<S> for ParsimonyDecorator<S> {
  fn decorate(&mut self, instance: &TreeInstance<S>) -> Result<(), Report> {
    instance.check_bound_to(&self.tree)?;
    self.solution = Some(Parsimony::infer(instance, self.null)?);
    Ok(())
  }

  fn get_decoration(&self, idx: usize) -> Result<Decoration<S>, Report> {
    match &self.solution {
      Some(solution) => Ok(Decoration::Parsimony(solution.optimal(idx)?)),
      None => make_error!("Parsimony decoration of branch point #{idx} requested before decorating"),
    }
  }
}
