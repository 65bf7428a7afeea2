pub mod tree_network;
