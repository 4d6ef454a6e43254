//! Master side of the runner: slave registry, round-robin assignment and
//! the task lifecycle state machine.

pub mod controller;
pub mod monitor;
pub mod slave_client;
pub mod slave_watcher;
pub mod strategies;

#[cfg(test)]
mod strategies_test;
#[cfg(test)]
pub mod test_utils;

pub use controller::TaskController;
pub use monitor::{Assignment, Monitor, UpdateOutcome};
pub use slave_client::{HttpSlaveClient, TaskForwarder};
pub use slave_watcher::{SlaveWatcher, SlaveWatcherConfig, SyncReport};
pub use strategies::{RoundRobinStrategy, SlaveSelectionStrategy};
