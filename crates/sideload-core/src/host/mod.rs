//! Remote package host interface
//!
//! The device-side package manager as the orchestrator sees it. Transport and
//! authentication live in implementations of [`PackageHost`].

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

/// A package installed on the device, as the device reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub publisher: String,
    pub version: String,
    /// `name_version_arch_resourceId_publisherHash`
    pub full_name: String,
    /// Application user model id (AUMID) used to launch the app.
    pub launch_id: String,
}

/// Parameters of a host install call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInstallRequest {
    /// Install destination on the device; `None` for the default.
    pub destination: Option<String>,
    pub artifact: PathBuf,
    /// Flattened dependency artifacts, installed alongside the package.
    pub dependencies: Vec<PathBuf>,
    pub certificate: Option<PathBuf>,
    pub timeout_ms: u64,
    pub retry_count: u32,
    pub move_only: bool,
}

/// Status update emitted by a host while an install runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallProgress {
    pub phase: String,
    pub message: String,
}

impl InstallProgress {
    pub fn new(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for InstallProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase {} - {}", self.phase, self.message)
    }
}

/// Request-level detail attached to a host failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestDetail {
    pub target: String,
    pub reason: String,
    pub status: Option<u16>,
}

/// Failure reported by the package host.
///
/// A call can fail for several reasons at once; `message` is the primary
/// cause and `additional` holds the rest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
    pub request: Option<RequestDetail>,
    pub additional: Vec<String>,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            request: None,
            additional: Vec::new(),
        }
    }

    pub fn with_request(
        mut self,
        target: impl Into<String>,
        reason: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        self.request = Some(RequestDetail {
            target: target.into(),
            reason: reason.into(),
            status,
        });
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.additional.push(cause.into());
        self
    }

    /// Every cause, primary first.
    pub fn causes(&self) -> Vec<String> {
        std::iter::once(self.message.clone())
            .chain(self.additional.iter().cloned())
            .collect()
    }
}

/// Device package manager operations.
///
/// Calls are asynchronous; the orchestrator awaits each one before issuing the
/// next, so an implementation never sees two calls in flight from one
/// orchestrator.
pub trait PackageHost {
    fn list_installed(&self) -> impl Future<Output = Result<Vec<InstalledPackage>, HostError>>;

    /// Install a package. Status updates may be sent on `progress` until the
    /// call completes.
    fn install(
        &self,
        request: &HostInstallRequest,
        progress: Sender<InstallProgress>,
    ) -> impl Future<Output = Result<(), HostError>>;

    fn uninstall(&self, full_name: &str) -> impl Future<Output = Result<(), HostError>>;

    fn launch(&self, launch_id: &str, full_name: &str)
    -> impl Future<Output = Result<(), HostError>>;
}
