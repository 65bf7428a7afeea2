pub mod f81;
pub mod gtr;
pub mod subst_model;
