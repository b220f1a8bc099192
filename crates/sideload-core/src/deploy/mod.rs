//! Deployment operations: list, install, run and uninstall against a
//! [`PackageHost`](crate::host::PackageHost).

mod error;
mod operation;
mod orchestrator;
mod poll;

pub use error::{DeployError, OperationError};
pub use operation::{
    InstallReport, InstallRequest, LaunchTarget, Operation, OperationState, RunRequest,
};
pub use orchestrator::DeploymentOrchestrator;
