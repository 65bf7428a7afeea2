use crate::decor::decoration::{Decoration, Decorator};
use crate::domain::Symbol;
use crate::tree::tree_instance::TreeInstance;
use crate::utils::error::AsrError;
use eyre::{Report, WrapErr};
use log::debug;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::BTreeMap;

/// One independent unit of work: a decorator, the observations to decorate with, and the branch points whose
/// decorations are collected afterwards.
pub struct DecorationTask<S: Symbol> {
  pub instance: TreeInstance<S>,
  pub decorator: Box<dyn Decorator<S>>,
  pub targets: Vec<usize>,
}

impl<S: Symbol> DecorationTask<S> {
  pub fn new(instance: TreeInstance<S>, decorator: Box<dyn Decorator<S>>, targets: Vec<usize>) -> Self {
    Self {
      instance,
      decorator,
      targets,
    }
  }

  fn execute(mut self) -> Result<BTreeMap<usize, Decoration<S>>, Report> {
    self.decorator.decorate(&self.instance)?;
    self
      .targets
      .iter()
      .map(|&idx| Ok((idx, self.decorator.get_decoration(idx)?)))
      .collect()
  }
}

/// Name prefix of worker threads, followed by the worker index
pub const WORKER_THREAD_PREFIX: &str = "pogtree-worker-";

/// Decorations of a batch: task index -> branch point -> decoration
pub type DecorationResults<S> = BTreeMap<usize, BTreeMap<usize, Decoration<S>>>;

/// Reusable pool of worker threads executing batches of independent decoration tasks.
///
/// `run()` is a barrier: it returns only once every task of the batch has finished. If any task fails, the whole
/// batch fails with the error of the failed task with the lowest index, so the outcome does not depend on the
/// number of threads or on scheduling.
pub struct DecorationPool {
  pool: ThreadPool,
}

impl DecorationPool {
  /// Creates a pool with the given number of threads. Zero means one thread per logical CPU.
  pub fn new(num_threads: usize) -> Result<Self, Report> {
    let num_threads = if num_threads == 0 { num_cpus::get() } else { num_threads };
    let pool = ThreadPoolBuilder::new()
      .num_threads(num_threads)
      .thread_name(|i| format!("{WORKER_THREAD_PREFIX}{i}"))
      .build()
      .wrap_err_with(|| format!("When creating a pool of {num_threads} worker threads"))?;
    Ok(Self { pool })
  }

  pub fn num_threads(&self) -> usize {
    self.pool.current_num_threads()
  }

  /// Executes all present tasks. Absent (`None`) tasks are skipped and have no entry in the results.
  pub fn run<S: Symbol>(&self, tasks: Vec<Option<DecorationTask<S>>>) -> Result<DecorationResults<S>, Report> {
    let n_tasks = tasks.len();
    let outcomes: Vec<(usize, Result<BTreeMap<usize, Decoration<S>>, Report>)> = self.pool.install(|| {
      tasks
        .into_par_iter()
        .enumerate()
        .filter_map(|(index, task)| task.map(|task| (index, task.execute())))
        .collect()
    });

    debug!(
      "Decoration batch: {} of {n_tasks} tasks executed on {} threads",
      outcomes.len(),
      self.num_threads()
    );

    outcomes
      .into_iter()
      .map(|(index, outcome)| outcome.map(|decorations| (index, decorations)).wrap_err(AsrError::TaskFailed { index }))
      .collect()
  }
}
