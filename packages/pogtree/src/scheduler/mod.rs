pub mod decoration_pool;
