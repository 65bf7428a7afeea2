pub mod engine;
pub mod tree_elimination;
