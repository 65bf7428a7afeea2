pub mod optimal_set;
pub mod parsimony;
