//! Operation kinds, their requests and their outcomes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::host::InstalledPackage;
use crate::identity::PackageIdentity;
use crate::manifest::PackageManifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Install,
    Run,
    Uninstall,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Install => "install",
            Operation::Run => "run",
            Operation::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(Operation::List),
            "install" => Ok(Operation::Install),
            "run" => Ok(Operation::Run),
            "uninstall" => Ok(Operation::Uninstall),
            other => Err(format!(
                "Unknown operation: {}. Use 'list', 'install', 'run' or 'uninstall'",
                other
            )),
        }
    }
}

/// Lifecycle of the most recent operation on an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Idle,
    Running(Operation),
    Succeeded(Operation),
    Failed(Operation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub artifact: PathBuf,
    pub certificate: Option<PathBuf>,
    /// Launch the app once installed.
    pub launch: bool,
}

impl InstallRequest {
    pub fn new(artifact: impl Into<PathBuf>) -> Self {
        Self {
            artifact: artifact.into(),
            certificate: None,
            launch: false,
        }
    }

    pub fn with_certificate(mut self, certificate: impl Into<PathBuf>) -> Self {
        self.certificate = Some(certificate.into());
        self
    }

    pub fn with_launch(mut self, launch: bool) -> Self {
        self.launch = launch;
        self
    }
}

/// What to launch.
///
/// Either explicit names, or the identity of a package that was just
/// installed (`pending`), whose names may still have to be recovered from
/// the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub package_full_name: Option<String>,
    pub launch_id: Option<String>,
    pub pending: Option<PackageIdentity>,
}

impl RunRequest {
    pub fn new(package_full_name: impl Into<String>, launch_id: impl Into<String>) -> Self {
        Self {
            package_full_name: Some(package_full_name.into()),
            launch_id: Some(launch_id.into()),
            pending: None,
        }
    }

    pub fn pending(identity: PackageIdentity) -> Self {
        Self {
            package_full_name: None,
            launch_id: None,
            pending: Some(identity),
        }
    }
}

/// Names a launch was issued with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub package_full_name: String,
    pub launch_id: String,
}

impl From<&InstalledPackage> for LaunchTarget {
    fn from(package: &InstalledPackage) -> Self {
        Self {
            package_full_name: package.full_name.clone(),
            launch_id: package.launch_id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub manifest: Arc<PackageManifest>,
    pub identity: PackageIdentity,
    /// Full names of previous installs removed before installing.
    pub removed: Vec<String>,
    /// Set when the install chained into a launch.
    pub launched: Option<LaunchTarget>,
}
