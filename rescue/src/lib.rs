pub mod block_watcher;
pub mod briber;
pub mod bundle;
pub mod engine;
pub mod error;
pub mod intent;
pub mod l1;
pub mod planner;
pub mod relay;
pub mod simulator;
pub mod submission;
pub mod utils;

#[cfg(test)]
mod test_utils;
