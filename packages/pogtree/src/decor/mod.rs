pub mod decoration;
pub mod joint;
pub mod marginal;
