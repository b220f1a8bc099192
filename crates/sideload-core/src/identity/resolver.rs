//! Identity resolution from manifests or raw fields.

use std::sync::Arc;

use tracing::debug;

use super::{IdentityError, NameEncoder, PackageIdentity, UnavailableEncoder};
use crate::manifest::PackageManifest;
use crate::types::{Architecture, PackageVersion};

/// Raw identity fields supplied by a caller instead of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityFields {
    pub package_name: String,
    pub app_id: String,
    pub publisher: String,
    pub version: String,
    /// Defaults to `neutral`.
    pub cpu_architecture: Option<Architecture>,
    /// Defaults to empty.
    pub resource_id: Option<String>,
}

impl IdentityFields {
    pub fn new(
        package_name: impl Into<String>,
        app_id: impl Into<String>,
        publisher: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            app_id: app_id.into(),
            publisher: publisher.into(),
            version: version.into(),
            cpu_architecture: None,
            resource_id: None,
        }
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.cpu_architecture = Some(architecture);
        self
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }
}

/// Builds [`PackageIdentity`] values using a platform [`NameEncoder`].
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    encoder: Arc<dyn NameEncoder>,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(Arc::new(UnavailableEncoder))
    }
}

impl IdentityResolver {
    pub fn new(encoder: Arc<dyn NameEncoder>) -> Self {
        Self { encoder }
    }

    /// Resolve the identity declared by a valid manifest.
    pub fn resolve(&self, manifest: &PackageManifest) -> Result<PackageIdentity, IdentityError> {
        let fields = manifest.fields().ok_or_else(|| {
            IdentityError::InvalidManifest(manifest.path().display().to_string())
        })?;

        self.resolve_fields(IdentityFields {
            package_name: fields.package_name.clone(),
            app_id: fields.app_id.clone(),
            publisher: fields.publisher.clone(),
            version: fields.version.clone(),
            cpu_architecture: Some(fields.cpu_architecture),
            resource_id: Some(fields.resource_id.clone()),
        })
    }

    /// Resolve an identity from caller-supplied fields.
    pub fn resolve_fields(&self, fields: IdentityFields) -> Result<PackageIdentity, IdentityError> {
        require("PackageName", &fields.package_name)?;
        require("AppId", &fields.app_id)?;
        require("Publisher", &fields.publisher)?;
        require("Version", &fields.version)?;

        let cpu_architecture = fields.cpu_architecture.unwrap_or_default();
        let parsed_version = fields.version.parse::<PackageVersion>().ok();

        let package_family_name = self
            .encoder
            .family_name(&fields.package_name, &fields.publisher);
        let package_full_name = self.encoder.full_name(
            &fields.package_name,
            &fields.publisher,
            parsed_version,
            cpu_architecture,
        );

        let launch_id = if package_family_name.trim().is_empty() {
            String::new()
        } else {
            format!("{}!{}", package_family_name, fields.app_id)
        };
        let complete_identity =
            !package_full_name.trim().is_empty() && !package_family_name.trim().is_empty();

        debug!(
            package = %fields.package_name,
            complete = complete_identity,
            "Resolved package identity"
        );

        Ok(PackageIdentity {
            package_name: fields.package_name,
            app_id: fields.app_id,
            publisher: fields.publisher,
            version: fields.version,
            parsed_version,
            cpu_architecture,
            resource_id: fields.resource_id.unwrap_or_default(),
            package_full_name,
            package_family_name,
            launch_id,
            complete_identity,
        })
    }
}

fn require(field: &'static str, value: &str) -> Result<(), IdentityError> {
    if value.trim().is_empty() {
        return Err(IdentityError::BlankField(field));
    }
    Ok(())
}
