//! Sideload Core Library
//!
//! Deploys app packages to a remote device: reads package manifests,
//! derives package identities, and drives install, launch and uninstall
//! calls against a device package host.

pub mod config;
pub mod deploy;
pub mod host;
pub mod identity;
pub mod manifest;
pub mod matcher;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, DeployConfig, InstallSettings, PollPolicy};

    // Manifests
    pub use crate::manifest::{ManifestCache, ManifestError, ManifestParser, PackageManifest};

    // Identity
    pub use crate::identity::{
        DeterministicEncoder, IdentityError, IdentityResolver, NameEncoder, PackageIdentity,
    };

    // Host
    pub use crate::host::{HostError, InstallProgress, InstalledPackage, PackageHost};

    // Deployment
    pub use crate::deploy::{
        DeployError, DeploymentOrchestrator, InstallRequest, LaunchTarget, Operation,
        OperationError, OperationState, RunRequest,
    };

    // Shared types
    pub use crate::types::{Architecture, PackageVersion};
}
