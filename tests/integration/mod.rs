//! Integration tests for hierarchy resolution and archive export

mod background_pack;
mod hierarchy_paths;
mod packaging_scenarios;
mod sled_store;
mod tree_properties;
