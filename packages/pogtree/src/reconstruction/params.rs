use crate::constants::DEFAULT_REPAIR_MAX_ITERATIONS;
use crate::indel::predict::IndelMethod;
use crate::pog::consensus::PathSearch;
use eyre::{Report, WrapErr};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Settings of a reconstruction run. Fields missing from a JSON document take their default values.
#[derive(Clone, Debug, PartialEq, Eq, SmartDefault, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconstructionParams {
  /// Number of worker threads for per-position inference. Zero means one per logical CPU.
  #[default(num_cpus::get())]
  pub jobs: usize,

  pub indel_method: IndelMethod,

  /// Remove nodes of ancestor POGs which are on no path from start to end
  #[default = true]
  pub nibble: bool,

  /// Re-admit ambiguous intervals in simple indel coding
  pub readmit_ambiguous: bool,

  #[default(DEFAULT_REPAIR_MAX_ITERATIONS)]
  pub repair_max_iterations: usize,

  pub path_search: PathSearch,
}

impl ReconstructionParams {
  pub fn from_json_str(s: impl AsRef<str>) -> Result<Self, Report> {
    serde_json::from_str(s.as_ref()).wrap_err("When reading reconstruction parameters from JSON string")
  }
}
