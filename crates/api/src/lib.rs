//! HTTP surfaces of the master and slave services.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use routes::{create_master_routes, create_slave_routes, MasterState, SlaveState};
