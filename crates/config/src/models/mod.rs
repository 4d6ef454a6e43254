pub mod app_config;
pub mod discovery;
pub mod execution;
pub mod master_slave;
pub mod observability;

pub use app_config::*;
pub use discovery::*;
pub use execution::*;
pub use master_slave::*;
pub use observability::*;
