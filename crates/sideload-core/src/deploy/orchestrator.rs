//! Deployment orchestrator
//!
//! Sequences manifest parsing, identity resolution and host calls into the
//! list, install, run and uninstall operations. One operation runs at a time
//! per orchestrator; a call made while another is in flight fails at once.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Mutex, MutexGuard, TryLockError};

use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use super::error::Diagnostics;
use super::poll::{DelayMode, poll};
use super::{
    DeployError, InstallReport, InstallRequest, LaunchTarget, Operation, OperationError,
    OperationState, RunRequest,
};
use crate::config::DeployConfig;
use crate::host::{HostError, HostInstallRequest, InstalledPackage, PackageHost};
use crate::identity::{IdentityResolver, PackageIdentity};
use crate::manifest::ManifestParser;
use crate::matcher;

pub struct DeploymentOrchestrator<H> {
    host: H,
    parser: ManifestParser,
    resolver: IdentityResolver,
    config: DeployConfig,
    runtime: Runtime,
    running: Mutex<()>,
    state: Mutex<OperationState>,
}

impl<H: PackageHost> DeploymentOrchestrator<H> {
    /// Create an orchestrator over `host`.
    ///
    /// Host calls are driven on a private current-thread runtime, so the
    /// operations must not be called from inside another tokio runtime.
    pub fn new(host: H, config: DeployConfig) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            host,
            parser: ManifestParser::new(),
            resolver: IdentityResolver::default(),
            config,
            runtime,
            running: Mutex::new(()),
            state: Mutex::new(OperationState::Idle),
        })
    }

    pub fn with_parser(mut self, parser: ManifestParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_resolver(mut self, resolver: IdentityResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn parser(&self) -> &ManifestParser {
        &self.parser
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn state(&self) -> OperationState {
        *lock(&self.state)
    }

    /// Packages currently installed on the device.
    pub fn list(&self) -> Result<Vec<InstalledPackage>, OperationError> {
        self.execute(Operation::List, |_| {
            let installed = self
                .query_installed()
                .map_err(DeployError::HostUnavailable)?;
            info!(count = installed.len(), "Retrieved installed packages");
            Ok(installed)
        })
    }

    /// Install a package artifact, replacing any previous install of it.
    ///
    /// Every installed package with the same name and publisher is removed
    /// first; a failed removal aborts before anything is installed.
    pub fn install(&self, request: &InstallRequest) -> Result<InstallReport, OperationError> {
        self.execute(Operation::Install, |diagnostics| {
            self.install_package(request, diagnostics)
        })
    }

    /// Launch an installed app.
    pub fn run(&self, request: &RunRequest) -> Result<LaunchTarget, OperationError> {
        self.execute(Operation::Run, |diagnostics| {
            self.launch_app(request, diagnostics)
        })
    }

    pub fn uninstall(&self, full_name: &str) -> Result<(), OperationError> {
        self.execute(Operation::Uninstall, |diagnostics| {
            if full_name.trim().is_empty() {
                return Err(DeployError::InvalidArgument(
                    "Must provide full name of app package to uninstall".to_string(),
                ));
            }
            self.remove_package(full_name, diagnostics)?;
            info!(package = %full_name, "Uninstall completed successfully");
            Ok(())
        })
    }

    fn execute<T>(
        &self,
        operation: Operation,
        body: impl FnOnce(&mut Diagnostics) -> Result<T, DeployError>,
    ) -> Result<T, OperationError> {
        let _guard = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                warn!(operation = %operation, "Rejected: existing operation still running");
                return Err(OperationError::new(
                    operation,
                    DeployError::OperationInProgress,
                    Diagnostics::default(),
                ));
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        self.set_state(OperationState::Running(operation));
        info!(operation = %operation, "Starting app operation");

        let mut diagnostics = Diagnostics::default();
        match body(&mut diagnostics) {
            Ok(value) => {
                self.set_state(OperationState::Succeeded(operation));
                info!(operation = %operation, "App operation completed");
                Ok(value)
            }
            Err(source) => {
                self.set_state(OperationState::Failed(operation));
                let error = OperationError::new(operation, source, diagnostics);
                warn!(operation = %operation, error = %error, "App operation failed");
                Err(error)
            }
        }
    }

    fn install_package(
        &self,
        request: &InstallRequest,
        diagnostics: &mut Diagnostics,
    ) -> Result<InstallReport, DeployError> {
        debug!(artifact = %request.artifact.display(), "Starting package installation");

        if !request.artifact.exists() {
            return Err(DeployError::ArtifactNotFound(request.artifact.clone()));
        }
        let artifact = absolute(&request.artifact);

        let certificate = match &request.certificate {
            Some(path) if !path.as_os_str().is_empty() => {
                if !path.exists() {
                    return Err(DeployError::CertificateNotFound(path.clone()));
                }
                Some(absolute(path))
            }
            _ => None,
        };

        let manifest = self.parser.parse(&artifact)?;
        if !manifest.is_valid() {
            return Err(DeployError::InvalidManifest(request.artifact.clone()));
        }
        let identity = self.resolver.resolve(&manifest)?;

        let installed = self
            .query_installed()
            .map_err(DeployError::HostUnavailable)?;
        let mut removed = Vec::new();
        for previous in matcher::find_loose(&identity, &installed) {
            info!(package = %previous.full_name, "Uninstalling previous package");
            self.remove_package(&previous.full_name, diagnostics)?;
            removed.push(previous.full_name.clone());
        }

        let host_request = HostInstallRequest {
            destination: None,
            artifact,
            dependencies: manifest.dependencies().to_vec(),
            certificate,
            timeout_ms: self.config.install.timeout_ms,
            retry_count: self.config.install.retry_count,
            move_only: self.config.install.move_only,
        };
        debug!(
            dependencies = host_request.dependencies.len(),
            "Installing package with dependencies"
        );

        let (progress, updates) = mpsc::channel();
        let result = self
            .runtime
            .block_on(self.host.install(&host_request, progress));
        let mut last_status = None;
        for update in updates.try_iter() {
            debug!(phase = %update.phase, message = %update.message, "Install progress");
            last_status = Some(update);
        }
        // Only a failed install reports its last phase.
        result.map_err(|source| {
            diagnostics.last_status = last_status;
            diagnostics.record_host_error(&source);
            DeployError::Install(source)
        })?;
        info!(package = %identity.package_name, "Installation completed successfully");

        let launched = if request.launch {
            Some(self.launch_app(&RunRequest::pending(identity.clone()), diagnostics)?)
        } else {
            None
        };

        Ok(InstallReport {
            manifest,
            identity,
            removed,
            launched,
        })
    }

    fn launch_app(
        &self,
        request: &RunRequest,
        diagnostics: &mut Diagnostics,
    ) -> Result<LaunchTarget, DeployError> {
        let target = match &request.pending {
            Some(identity) if !identity.complete_identity => self.resolve_from_device(identity)?,
            Some(identity) => {
                let target = LaunchTarget {
                    package_full_name: non_blank(&request.package_full_name)
                        .unwrap_or(identity.package_full_name.as_str())
                        .to_string(),
                    launch_id: non_blank(&request.launch_id)
                        .unwrap_or(identity.launch_id.as_str())
                        .to_string(),
                };
                self.wait_for_registration(&target.package_full_name);
                target
            }
            None => {
                let package_full_name = non_blank(&request.package_full_name).ok_or_else(|| {
                    DeployError::InvalidArgument(
                        "Must provide full name of app package to launch".to_string(),
                    )
                })?;
                let launch_id = non_blank(&request.launch_id).ok_or_else(|| {
                    DeployError::InvalidArgument(
                        "Must provide the AUMID of the app to launch from the specified package"
                            .to_string(),
                    )
                })?;
                LaunchTarget {
                    package_full_name: package_full_name.to_string(),
                    launch_id: launch_id.to_string(),
                }
            }
        };

        debug!(
            package = %target.package_full_name,
            launch_id = %target.launch_id,
            "Launching application"
        );
        self.runtime
            .block_on(
                self.host
                    .launch(&target.launch_id, &target.package_full_name),
            )
            .map_err(|source| {
                diagnostics.record_host_error(&source);
                DeployError::Launch {
                    launch_id: target.launch_id.clone(),
                    source,
                }
            })?;
        info!(launch_id = %target.launch_id, "Application launched");
        Ok(target)
    }

    /// Recover the device-assigned names of a just-installed package.
    fn resolve_from_device(&self, identity: &PackageIdentity) -> Result<LaunchTarget, DeployError> {
        debug!(package = %identity.package_name, "Querying device for installed package identity");

        let outcome = poll(
            &self.config.identity_resolution,
            DelayMode::Between,
            |remaining| match self.query_installed() {
                Ok(installed) => {
                    matcher::find_exact(identity, &installed, remaining).map(LaunchTarget::from)
                }
                Err(e) => {
                    warn!(error = %e, "Failed to acquire list of installed packages from device");
                    None
                }
            },
        );

        let attempts = outcome.attempts;
        outcome
            .value
            .ok_or_else(|| DeployError::IdentityResolutionFailed {
                package_name: identity.package_name.clone(),
                attempts,
            })
    }

    /// Give the device time to report a package it just installed.
    fn wait_for_registration(&self, full_name: &str) {
        let outcome = poll(&self.config.registration, DelayMode::BeforeEach, |_| {
            match self.query_installed() {
                Ok(installed) => installed
                    .iter()
                    .any(|package| package.full_name == full_name)
                    .then_some(()),
                Err(e) => {
                    warn!(error = %e, "Failed to acquire list of installed packages from device");
                    None
                }
            }
        });

        if outcome.value.is_none() {
            warn!(
                package = %full_name,
                attempts = outcome.attempts,
                "Package not yet reported by device, launching anyway"
            );
        }
    }

    fn remove_package(
        &self,
        full_name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), DeployError> {
        self.runtime
            .block_on(self.host.uninstall(full_name))
            .map_err(|source| {
                diagnostics.record_host_error(&source);
                DeployError::Uninstall {
                    full_name: full_name.to_string(),
                    source,
                }
            })
    }

    fn query_installed(&self) -> Result<Vec<InstalledPackage>, HostError> {
        self.runtime.block_on(self.host.list_installed())
    }

    fn set_state(&self, state: OperationState) {
        *lock(&self.state) = state;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
