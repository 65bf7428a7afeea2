use crate::domain::Symbol;
use crate::inference::engine::{Assignment, Distribution, InferenceEngine};
use crate::network::tree_network::TreeNetwork;
use crate::utils::ndarray::{argmax_first, normalize_inplace};
use crate::{make_error, make_internal_report};
use eyre::Report;
use ndarray::{Array1, Array2};
use std::sync::Arc;

/// Variable elimination specialized to tree-shaped networks.
///
/// Children are eliminated before their parents, which on a depth-first indexed tree is simply descending index
/// order. No elimination ordering needs to be searched for.
#[derive(Clone, Debug)]
pub struct TreeElimination<S: Symbol> {
  network: Arc<TreeNetwork<S>>,
  evidence: Vec<Option<usize>>,
}

impl<S: Symbol> TreeElimination<S> {
  fn n_states(&self) -> usize {
    self.network.domain().len()
  }

  /// Indicator of the evidence at a branch point: all ones when unobserved
  fn evidence_vector(&self, idx: usize) -> Array1<f64> {
    match self.evidence[idx] {
      Some(i) => Array1::from_shape_fn(self.n_states(), |j| if i == j { 1.0 } else { 0.0 }),
      None => Array1::ones(self.n_states()),
    }
  }

  fn cpt(&self, idx: usize) -> Result<&Array2<f64>, Report> {
    self
      .network
      .cpt(idx)
      .ok_or_else(|| make_internal_report!("Branch point #{idx} is expected to have a parent"))
  }

  /// Upward sum-product pass. Returns, for every branch point, the rescaled likelihood of the evidence below it
  /// (`beta`) and, for every non-root branch point, the rescaled message it sends to its parent.
  fn upward(&self) -> Result<(Vec<Array1<f64>>, Vec<Option<Array1<f64>>>), Report> {
    let tree = self.network.tree();
    let n = tree.size();
    let mut beta = vec![Array1::<f64>::zeros(0); n];
    let mut messages: Vec<Option<Array1<f64>>> = vec![None; n];

    for idx in tree.iter_postorder() {
      let mut b = self.evidence_vector(idx);
      for &child in tree.children(idx) {
        let msg = messages[child]
          .as_ref()
          .ok_or_else(|| make_internal_report!("Message from branch point #{child} is not ready"))?;
        b *= msg;
      }

      if tree.parent(idx).is_some() {
        let mut msg = self.cpt(idx)?.dot(&b);
        normalize_inplace(&mut msg);
        messages[idx] = Some(msg);
      }
      beta[idx] = b;
    }

    Ok((beta, messages))
  }
}

impl<S: Symbol> InferenceEngine<S> for TreeElimination<S> {
  fn instantiate(network: Arc<TreeNetwork<S>>) -> Self {
    let evidence = vec![None; network.tree().size()];
    Self { network, evidence }
  }

  fn network(&self) -> &TreeNetwork<S> {
    &self.network
  }

  fn set_evidence(&mut self, idx: usize, value: S) -> Result<(), Report> {
    if idx >= self.evidence.len() {
      return make_error!(
        "Unable to set evidence: branch point #{idx} is out of range of the network of size {}",
        self.evidence.len()
      );
    }
    self.evidence[idx] = Some(self.network.domain().encode(&value)?);
    Ok(())
  }

  fn reset_evidence(&mut self) {
    self.evidence.fill(None);
  }

  fn make_mpe(&self) -> Result<Assignment<S>, Report> {
    let tree = self.network.tree();
    let n = tree.size();
    let k = self.n_states();

    // Max-product in log space. `best_child[c][i]` is the best state of `c` given its parent is in state `i`.
    let mut local = vec![Array1::<f64>::zeros(0); n];
    let mut best_child: Vec<Vec<usize>> = vec![vec![]; n];

    for idx in tree.iter_postorder() {
      let mut score = self.evidence_vector(idx).mapv(f64::ln);
      for &child in tree.children(idx) {
        let log_cpt = self.cpt(child)?.mapv(f64::ln);
        let child_score = &local[child];
        let mut choice = Vec::with_capacity(k);
        for i in 0..k {
          let candidates = &log_cpt.row(i) + child_score;
          match argmax_first(candidates.view()) {
            Some(j) => {
              score[i] += candidates[j];
              choice.push(j);
            }
            None => {
              score[i] = f64::NEG_INFINITY;
              choice.push(0);
            }
          }
        }
        best_child[child] = choice;
      }
      local[idx] = score;
    }

    let root = tree.root();
    let root_score = self.network.prior().mapv(f64::ln) + &local[root];
    let Some(root_state) = argmax_first(root_score.view()) else {
      return make_error!("Unable to find the most probable explanation: evidence has zero probability under the model");
    };

    let mut states = vec![0; n];
    states[root] = root_state;
    for idx in tree.iter_preorder() {
      for &child in tree.children(idx) {
        states[child] = best_child[child][states[idx]];
      }
    }

    states.into_iter().map(|i| self.network.domain().decode(i)).collect()
  }

  fn make_query(&self, idx: usize) -> Result<Distribution<S>, Report> {
    let tree = self.network.tree();
    if idx >= tree.size() {
      return make_error!(
        "Unable to query branch point #{idx}: out of range of the network of size {}",
        tree.size()
      );
    }

    let (beta, messages) = self.upward()?;

    // Downward pass only along the path from the root to the queried branch point
    let path = tree.path_from_root(idx);
    let mut alpha = self.network.prior().clone();
    for (&parent, &child) in path.iter().zip(path.iter().skip(1)) {
      let mut outside = &alpha * &self.evidence_vector(parent);
      for &sibling in tree.children(parent) {
        if sibling != child {
          if let Some(msg) = &messages[sibling] {
            outside *= msg;
          }
        }
      }
      alpha = outside.dot(self.cpt(child)?);
      normalize_inplace(&mut alpha);
    }

    let mut posterior = &alpha * &beta[idx];
    let norm = normalize_inplace(&mut posterior);
    if norm.is_nan() || norm <= 0.0 {
      return make_error!(
        "Unable to compute marginal distribution of branch point '{}': evidence has zero probability under the model",
        tree.label(idx)
      );
    }

    Distribution::new(self.network.domain().clone(), posterior)
  }
}
