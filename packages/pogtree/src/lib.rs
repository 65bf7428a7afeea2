pub mod alignment;
pub mod constants;
pub mod decor;
pub mod domain;
pub mod indel;
pub mod inference;
pub mod model;
pub mod network;
pub mod parsimony;
pub mod pog;
pub mod reconstruction;
pub mod scheduler;
pub mod tree;
pub mod utils;
