pub mod api;
pub mod bridge_runtime;
pub mod config;
pub mod constants;
pub mod event;
pub mod node;
pub mod resources;
pub mod test_device;
pub mod utils;
