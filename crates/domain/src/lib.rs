//! Shared data model of the task runner: task specifications, the status
//! wire enum, master-side runtime records and the payloads exchanged between
//! master and slaves.

pub mod payloads;
pub mod portal;
pub mod slave;
pub mod status;
pub mod task;
pub mod task_config;

pub use conveyor_errors::{SchedulerError, SchedulerResult};
pub use payloads::*;
pub use portal::*;
pub use slave::*;
pub use status::*;
pub use task::*;
pub use task_config::*;
