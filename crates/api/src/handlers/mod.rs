pub mod artifacts;
pub mod health;
pub mod metrics;
pub mod slave;
pub mod tasks;
pub mod workers;
