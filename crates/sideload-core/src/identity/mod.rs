//! Package identity resolution
//!
//! Turns manifest fields (or caller-supplied fields) into a
//! [`PackageIdentity`] carrying the derived family name, full name and launch
//! id needed to address an installed package.

pub mod encoder;
pub mod resolver;

use serde::Serialize;

use crate::types::{Architecture, PackageVersion};

pub use encoder::{DeterministicEncoder, NameEncoder, UnavailableEncoder};
pub use resolver::{IdentityFields, IdentityResolver};

/// Resolved identity of a package.
///
/// `complete_identity` only reflects whether name derivation succeeded; it
/// says nothing about what is installed on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageIdentity {
    pub package_name: String,
    pub app_id: String,
    pub publisher: String,
    pub version: String,
    #[serde(skip)]
    pub parsed_version: Option<PackageVersion>,
    pub cpu_architecture: Architecture,
    pub resource_id: String,
    pub package_full_name: String,
    pub package_family_name: String,
    /// `<family name>!<app id>`, empty without a family name.
    pub launch_id: String,
    pub complete_identity: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("{0} is invalid")]
    BlankField(&'static str),

    #[error("manifest {0} is not a valid application manifest")]
    InvalidManifest(String),
}
