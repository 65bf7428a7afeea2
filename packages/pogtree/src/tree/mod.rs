pub mod indexed_tree;
pub mod tree_builder;
pub mod tree_instance;
