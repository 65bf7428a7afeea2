pub mod bidirectional;
pub mod interval;
pub mod position_specific;
pub mod predict;
pub mod repair;
pub mod simple_indel_coding;
