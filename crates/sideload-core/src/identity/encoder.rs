//! Platform package name derivation.
//!
//! The family and full names of a package are derived by a platform
//! capability. Derivation is best-effort: an encoder returns an empty string
//! when it cannot produce a name.

use std::fmt;

use crate::types::{Architecture, PackageVersion};

/// Derives platform package identifiers from identity fields.
pub trait NameEncoder: fmt::Debug + Send + Sync {
    /// Family name (stable across versions and architectures), or empty.
    fn family_name(&self, name: &str, publisher: &str) -> String;

    /// Full name of one version/architecture of a package, or empty.
    fn full_name(
        &self,
        name: &str,
        publisher: &str,
        version: Option<PackageVersion>,
        architecture: Architecture,
    ) -> String;
}

/// Encoder for hosts without the platform naming API. Always empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableEncoder;

impl NameEncoder for UnavailableEncoder {
    fn family_name(&self, _name: &str, _publisher: &str) -> String {
        String::new()
    }

    fn full_name(
        &self,
        _name: &str,
        _publisher: &str,
        _version: Option<PackageVersion>,
        _architecture: Architecture,
    ) -> String {
        String::new()
    }
}

/// Portable encoder producing platform-shaped names.
///
/// The publisher hash is 13 base32 characters taken from a blake3 digest of
/// the publisher, so names are stable but do not equal the platform's own.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicEncoder;

const BASE32_ALPHABET: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

impl DeterministicEncoder {
    pub fn publisher_hash(publisher: &str) -> String {
        let digest = blake3::hash(publisher.as_bytes());
        let head = digest.as_bytes()[..8]
            .iter()
            .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte));
        // 64 bits padded to 65 gives 13 groups of 5.
        let padded = head << 1;

        (0..13)
            .map(|i| {
                let index = (padded >> (60 - 5 * i)) & 0x1f;
                BASE32_ALPHABET[index as usize] as char
            })
            .collect()
    }
}

impl NameEncoder for DeterministicEncoder {
    fn family_name(&self, name: &str, publisher: &str) -> String {
        if name.is_empty() || publisher.is_empty() {
            return String::new();
        }
        format!("{}_{}", name, Self::publisher_hash(publisher))
    }

    fn full_name(
        &self,
        name: &str,
        publisher: &str,
        version: Option<PackageVersion>,
        architecture: Architecture,
    ) -> String {
        match version {
            Some(version) if !name.is_empty() && !publisher.is_empty() => format!(
                "{}_{}_{}__{}",
                name,
                version,
                architecture,
                Self::publisher_hash(publisher)
            ),
            _ => String::new(),
        }
    }
}
