//! Deployment error taxonomy.

use std::fmt::Write as _;
use std::path::PathBuf;

use super::Operation;
use crate::host::{HostError, InstallProgress};
use crate::identity::IdentityError;
use crate::manifest::ManifestError;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("existing operation still running")]
    OperationInProgress,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("specified artifact '{}' wasn't found", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("specified certificate '{}' wasn't found", .0.display())]
    CertificateNotFound(PathBuf),

    #[error("failed to parse package manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("specified package '{}' contains an invalid manifest", .0.display())]
    InvalidManifest(PathBuf),

    #[error("invalid package identity: {0}")]
    InvalidIdentity(#[from] IdentityError),

    #[error("failed to retrieve installed packages from the device: {0}")]
    HostUnavailable(#[source] HostError),

    #[error("installation failed: {0}")]
    Install(#[source] HostError),

    #[error("uninstall of package '{full_name}' failed: {source}")]
    Uninstall {
        full_name: String,
        #[source]
        source: HostError,
    },

    #[error("launch of '{launch_id}' failed: {source}")]
    Launch {
        launch_id: String,
        #[source]
        source: HostError,
    },

    #[error(
        "failed to retrieve package '{package_name}' from the device after {attempts} attempts; cannot launch app"
    )]
    IdentityResolutionFailed { package_name: String, attempts: u32 },
}

impl DeployError {
    /// Host failure behind this error, if any.
    pub fn host_error(&self) -> Option<&HostError> {
        match self {
            DeployError::HostUnavailable(source)
            | DeployError::Install(source)
            | DeployError::Uninstall { source, .. }
            | DeployError::Launch { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure of an orchestrator operation.
///
/// Carries the primary cause as `source`, every cause the host reported, and
/// the last install status observed before the failure.
#[derive(Debug, thiserror::Error)]
#[error("app operation '{operation}' failed: {source}")]
pub struct OperationError {
    pub operation: Operation,
    #[source]
    pub source: DeployError,
    pub last_status: Option<InstallProgress>,
    pub causes: Vec<String>,
}

impl OperationError {
    pub(crate) fn new(operation: Operation, source: DeployError, diagnostics: Diagnostics) -> Self {
        Self {
            operation,
            source,
            last_status: diagnostics.last_status,
            causes: diagnostics.causes,
        }
    }

    pub fn kind(&self) -> &DeployError {
        &self.source
    }

    /// Multi-line diagnostic report of the failure.
    pub fn report(&self) -> String {
        let mut out = format!("{}\n", self);

        if let Some(status) = &self.last_status {
            let _ = writeln!(
                out,
                "Installation failed in phase {} - last status: {}",
                status.phase, status.message
            );
        }

        if self.causes.len() > 1 {
            out.push_str("Multiple errors were reported during operation:\n");
            for cause in &self.causes {
                let _ = writeln!(out, "  {}", cause);
            }
        }

        if let Some(detail) = self.source.host_error().and_then(|e| e.request.as_ref()) {
            out.push_str("Host request details:\n");
            let _ = writeln!(out, "Request: {}", detail.target);
            let _ = writeln!(out, "Reason: {}", detail.reason);
            if let Some(status) = detail.status {
                let _ = writeln!(out, "Status: {}", status);
            }
        }

        out
    }
}

/// Context gathered while an operation runs, reported on failure.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    pub last_status: Option<InstallProgress>,
    pub causes: Vec<String>,
}

impl Diagnostics {
    pub fn record_host_error(&mut self, error: &HostError) {
        self.causes = error.causes();
        if self.causes.len() > 1 {
            for cause in &self.causes {
                tracing::debug!(cause = %cause, "Host reported error");
            }
        }
    }
}
