pub mod consensus;
pub mod edge;
pub mod pog;
