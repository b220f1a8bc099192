//! Matching a package identity against a device's installed packages.

use tracing::debug;

use crate::host::InstalledPackage;
use crate::identity::PackageIdentity;

/// Components of a package full name, split on `_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullNameParts<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub architecture: &'a str,
    /// Empty when the package has no resource id.
    pub resource_id: &'a str,
    pub publisher_hash: &'a str,
}

impl<'a> FullNameParts<'a> {
    /// Split a full name into its five parts; `None` if there are fewer.
    pub fn parse(full_name: &'a str) -> Option<Self> {
        let mut parts = full_name.splitn(5, '_');
        Some(Self {
            name: parts.next()?,
            version: parts.next()?,
            architecture: parts.next()?,
            resource_id: parts.next()?,
            publisher_hash: parts.next()?,
        })
    }
}

/// Installed packages with the target's name and publisher, any version.
///
/// Used to find previous installs to remove before a fresh install.
pub fn find_loose<'a>(
    target: &PackageIdentity,
    installed: &'a [InstalledPackage],
) -> Vec<&'a InstalledPackage> {
    installed
        .iter()
        .filter(|package| {
            package.name == target.package_name && package.publisher == target.publisher
        })
        .collect()
}

/// The installed package that is exactly `target`, if the device reports it.
///
/// Candidates must agree on name, publisher and version, and their launch id
/// must contain the target app id. Several candidates are told apart by the
/// architecture and resource id embedded in their full names.
/// `remaining_attempts` only informs logging.
pub fn find_exact<'a>(
    target: &PackageIdentity,
    installed: &'a [InstalledPackage],
    remaining_attempts: u32,
) -> Option<&'a InstalledPackage> {
    let candidates: Vec<&InstalledPackage> = installed
        .iter()
        .filter(|package| {
            package.name == target.package_name
                && package.publisher == target.publisher
                && package.launch_id.contains(&target.app_id)
                && package.version == target.version
        })
        .collect();

    let found = match candidates.as_slice() {
        [] => None,
        [only] => Some(*only),
        many => disambiguate(target, many),
    };

    if found.is_none() {
        debug!(
            package = %target.package_name,
            candidates = candidates.len(),
            "No exact match on device, {}",
            if remaining_attempts > 0 { "trying again" } else { "giving up" }
        );
    }
    found
}

fn disambiguate<'a>(
    target: &PackageIdentity,
    candidates: &[&'a InstalledPackage],
) -> Option<&'a InstalledPackage> {
    candidates.iter().copied().find(|package| {
        FullNameParts::parse(&package.full_name).is_some_and(|parts| {
            parts.architecture == target.cpu_architecture.as_str()
                && parts.resource_id == target.resource_id
        })
    })
}
