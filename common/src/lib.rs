// Shared modules for the asset rescue node
pub mod config;
pub mod execution_layer;
pub mod metrics;
pub mod shared;
pub mod signer;
pub mod utils;
