#![allow(clippy::pub_use)]

use eyre::Report;
use thiserror::Error;

/// Failure kinds of the reconstruction engine which callers may want to tell apart.
///
/// These are converted into `eyre::Report` at the boundary, like every other error in this crate, and can be
/// recovered with `report.downcast_ref::<AsrError>()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsrError {
  #[error("Tree instance is bound to a different tree than the one used to build the inference network")]
  InvalidTopology,

  #[error("Symbol index {index} is outside of the domain of size {size}")]
  InvalidSymbol { index: usize, size: usize },

  #[error("Symbol '{symbol}' is not a member of the domain")]
  UnknownSymbol { symbol: String },

  #[error("Decoration requested for branch point #{requested}, but the decorator only answers queries for branch point #{nominated}")]
  InvalidQuery { requested: usize, nominated: usize },

  #[error("Ancestor POG '{ancestor}' has no path from start to end")]
  NonContiguous { ancestor: String },

  #[error("Unable to restore contiguity of ancestor POG '{ancestor}': {reason}")]
  RepairFailed { ancestor: String, reason: String },

  #[error("Unknown ancestor: '{0}'")]
  UnknownAncestor(String),

  #[error("Decoration task #{index} failed")]
  TaskFailed { index: usize },
}

pub fn report_to_string(report: &Report) -> String {
  let strings: Vec<String> = report.chain().map(std::string::ToString::to_string).collect();
  strings.join(": ")
}

/// Looks for an `AsrError` anywhere in the chain of a report
pub fn find_asr_error(report: &Report) -> Option<&AsrError> {
  report
    .downcast_ref::<AsrError>()
    .or_else(|| report.chain().find_map(|err| err.downcast_ref::<AsrError>()))
}

#[macro_export(local_inner_macros)]
macro_rules! make_error {
  ($($arg:tt)*) => {
    {
      Err(eyre::eyre!(std::format!($($arg)*)))
    }
  };
}

pub use make_error;

#[macro_export(local_inner_macros)]
macro_rules! make_report {
  ($($arg:tt)*) => {
    {
      eyre::eyre!($($arg)*)
    }
  };
}

pub use make_report;

#[macro_export(local_inner_macros)]
macro_rules! make_internal_error {
  ($($arg:tt)*) => {
    {
      let msg_external = std::format!($($arg)*);
      let msg = std::format!("{msg_external}. This is an internal error. Please report it to developers.");
      Err(eyre::eyre!(msg))
    }
  };
}

pub use make_internal_error;

#[macro_export(local_inner_macros)]
macro_rules! make_internal_report {
  ($($arg:tt)*) => {
    {
      let msg_external = std::format!($($arg)*);
      let msg = std::format!("{msg_external}. This is an internal error. Please report it to developers.");
      eyre::eyre!(msg)
    }
  };
}

pub use make_internal_report;
