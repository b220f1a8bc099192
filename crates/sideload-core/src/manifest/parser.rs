//! Manifest parsing with recursive dependency resolution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::document::parse_document;
use super::source::{read_extracted, read_manifest};
use super::{DependencyRequirement, ManifestCache, ManifestError, PackageManifest};

/// Folder next to a package that holds its dependency artifacts.
const DEPENDENCIES_FOLDER: &str = "Dependencies";

/// Extensions of artifacts considered when searching for dependencies.
const ARTIFACT_EXTENSIONS: [&str; 2] = ["appx", "msix"];

/// Parses package manifests, memoizing results in a [`ManifestCache`].
#[derive(Debug, Clone, Default)]
pub struct ManifestParser {
    cache: Arc<ManifestCache>,
}

impl ManifestParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that shares an existing cache.
    pub fn with_cache(cache: Arc<ManifestCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ManifestCache> {
        &self.cache
    }

    /// Parse the manifest of a package archive, document or extracted folder.
    ///
    /// Returns the cached manifest if `path` was parsed before; the source is
    /// not read again.
    pub fn parse(&self, path: &Path) -> Result<Arc<PackageManifest>, ManifestError> {
        self.parse_with(path, || read_manifest(path))
    }

    /// Parse the manifest of `path` from a directory it was already extracted to.
    ///
    /// The result is cached under `path`, not `extracted_dir`.
    pub fn parse_extracted(
        &self,
        path: &Path,
        extracted_dir: &Path,
    ) -> Result<Arc<PackageManifest>, ManifestError> {
        self.parse_with(path, || read_extracted(extracted_dir))
    }

    fn parse_with(
        &self,
        path: &Path,
        read: impl FnOnce() -> Result<String, ManifestError>,
    ) -> Result<Arc<PackageManifest>, ManifestError> {
        if let Some(cached) = self.cache.get(path) {
            trace!(path = %path.display(), "Manifest cache hit");
            return Ok(cached);
        }

        let text = read()?;
        let manifest = match parse_document(&text) {
            Ok(doc) => PackageManifest::valid(path, doc.fields, doc.dependencies),
            Err(reason) => {
                debug!(path = %path.display(), reason = %reason.0, "Not an application manifest");
                PackageManifest::invalid(path)
            }
        };

        // Cache before resolving dependencies so a cycle finds this entry.
        let manifest = Arc::new(manifest);
        let cached = self.cache.insert_if_absent(path, manifest.clone());
        if !Arc::ptr_eq(&cached, &manifest) {
            return Ok(cached);
        }

        let dependencies = match manifest.fields() {
            Some(fields) => self.resolve_dependencies(
                path,
                fields.cpu_architecture.as_str(),
                manifest.declared_dependencies(),
            ),
            None => Vec::new(),
        };
        manifest.publish_dependencies(dependencies);

        Ok(manifest)
    }

    fn resolve_dependencies(
        &self,
        path: &Path,
        architecture: &str,
        declared: &[DependencyRequirement],
    ) -> Vec<PathBuf> {
        let package_folder = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let dependencies_folder = package_folder.join(DEPENDENCIES_FOLDER);
        let search_folders = [
            dependencies_folder.join(architecture),
            dependencies_folder,
            package_folder,
        ];

        let mut flattened = Vec::new();
        for requirement in declared {
            match self.find_dependency(&search_folders, requirement) {
                Some(found) => {
                    debug!(
                        dependency = %requirement.name,
                        path = %found.path().display(),
                        "Resolved dependency"
                    );
                    flattened.extend(found.dependencies().iter().cloned());
                    flattened.push(found.path().to_path_buf());
                }
                None => {
                    debug!(dependency = %requirement.name, "No artifact found for dependency, skipping");
                }
            }
        }
        flattened
    }

    /// First valid manifest named like `requirement` across `folders`, in order.
    fn find_dependency(
        &self,
        folders: &[PathBuf],
        requirement: &DependencyRequirement,
    ) -> Option<Arc<PackageManifest>> {
        for folder in folders.iter().filter(|folder| folder.is_dir()) {
            for candidate in artifact_candidates(folder) {
                let manifest = match self.parse(&candidate) {
                    Ok(manifest) => manifest,
                    Err(e) => {
                        warn!(candidate = %candidate.display(), error = %e, "Skipping unreadable dependency candidate");
                        continue;
                    }
                };

                let matches = manifest
                    .package_name()
                    .is_some_and(|name| name.eq_ignore_ascii_case(&requirement.name));
                if matches {
                    return Some(manifest);
                }
            }
        }
        None
    }
}

fn artifact_candidates(folder: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(folder = %folder.display(), error = %e, "Failed to list dependency folder");
            return Vec::new();
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_artifact(path))
        .collect();
    candidates.sort();
    candidates
}

fn is_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ARTIFACT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
