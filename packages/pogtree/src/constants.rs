pub const TINY_NUMBER: f64 = 1e-12;

/// Lower cut-off for branch lengths used to build transition probabilities
pub const MIN_BRANCH_LENGTH: f64 = 1e-6;

/// Relative tolerance under which two scores (likelihoods, log-likelihoods) are considered tied
pub const TIE_TOLERANCE: f64 = 1e-9;

/// Edge weight used in place of `-ln(0)` during consensus path search
pub const MAX_EDGE_WEIGHT: f64 = 1e10;

/// Cost used in place of infinity in parsimony score tables
pub const PARSIMONY_INFINITY: u64 = u64::MAX / 4;

pub const DEFAULT_REPAIR_MAX_ITERATIONS: usize = 1000;
