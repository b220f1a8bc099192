//! Package manifest support
//!
//! Reads the `AppxManifest.xml` of a package (bare document, zip archive or
//! extracted directory), and resolves the package's dependency artifacts from
//! the folders next to it.

pub mod cache;
mod document;
pub mod parser;
mod source;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Serialize;

use crate::types::{Architecture, PackageVersion};

pub use cache::ManifestCache;
pub use parser::ManifestParser;
pub use source::MANIFEST_FILE_NAME;

/// Identity and metadata fields of a valid manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestFields {
    pub package_name: String,
    pub publisher: String,
    /// Raw version string as declared (dotted four-part form).
    pub version: String,
    /// Empty for packages without an Application, such as frameworks.
    pub app_id: String,
    pub cpu_architecture: Architecture,
    pub resource_id: String,
    pub is_framework: bool,
}

/// A dependency declared by a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRequirement {
    pub name: String,
    /// Declared minimum version, if it parsed.
    pub min_version: Option<PackageVersion>,
}

/// Parsed package manifest.
///
/// Created once per source path by [`ManifestParser`] and shared through the
/// [`ManifestCache`]. An invalid manifest carries no fields; callers branch on
/// [`PackageManifest::is_valid`].
#[derive(Debug)]
pub struct PackageManifest {
    path: PathBuf,
    fields: Option<ManifestFields>,
    declared: Vec<DependencyRequirement>,
    dependencies: OnceLock<Vec<PathBuf>>,
}

impl PackageManifest {
    pub(crate) fn valid(
        path: &Path,
        fields: ManifestFields,
        declared: Vec<DependencyRequirement>,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            fields: Some(fields),
            declared,
            dependencies: OnceLock::new(),
        }
    }

    pub(crate) fn invalid(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            fields: None,
            declared: Vec::new(),
            dependencies: OnceLock::new(),
        }
    }

    /// Source path this manifest was read for.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_valid(&self) -> bool {
        self.fields.is_some()
    }

    pub fn fields(&self) -> Option<&ManifestFields> {
        self.fields.as_ref()
    }

    pub fn package_name(&self) -> Option<&str> {
        self.fields.as_ref().map(|f| f.package_name.as_str())
    }

    pub fn is_framework(&self) -> bool {
        self.fields.as_ref().is_some_and(|f| f.is_framework)
    }

    /// Dependencies as declared in the manifest, resolved or not.
    pub fn declared_dependencies(&self) -> &[DependencyRequirement] {
        &self.declared
    }

    /// Flattened dependency artifact paths in post-order.
    ///
    /// Empty while the manifest's own dependencies are still being resolved,
    /// which is what a dependency cycle observes.
    pub fn dependencies(&self) -> &[PathBuf] {
        self.dependencies.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn publish_dependencies(&self, dependencies: Vec<PathBuf>) {
        let _ = self.dependencies.set(dependencies);
    }
}

/// I/O failures while locating or reading a manifest.
///
/// A manifest that is readable but not an application manifest is not an
/// error; it parses to an invalid [`PackageManifest`].
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open package archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("no AppxManifest.xml found in {}", .path.display())]
    MissingManifest { path: PathBuf },
}
