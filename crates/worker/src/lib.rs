pub mod executors;
pub mod metrics_extract;
pub mod pipeline;
pub mod pool;
pub mod reporter;
pub mod sandbox;
pub mod script;

#[cfg(test)]
mod executors_test;
#[cfg(test)]
pub mod test_utils;

pub use executors::{create_sandbox, DockerSandbox, ShellSandbox};
pub use metrics_extract::extract_metrics;
pub use pipeline::PipelineExecutor;
pub use pool::IntakePool;
pub use reporter::{MasterClient, MasterTransport, StatusEvent, StatusReporter, StatusSink};
pub use sandbox::{Sandbox, SandboxOutput, SandboxRequest};
pub use script::render_entry_script;
