//! Locating and reading manifest text from a package source.
//!
//! A source is a bare manifest document (`.xml`), a zip-based package archive,
//! or a directory holding an already extracted package.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::ManifestError;

/// Manifest file name inside a package. Matched case-insensitively.
pub const MANIFEST_FILE_NAME: &str = "AppxManifest.xml";

/// Read the manifest text for `path`, detecting the source kind.
pub(crate) fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    if path.is_dir() {
        return read_extracted(path);
    }

    let is_document = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));

    if is_document {
        read_document(path)
    } else {
        read_archive(path)
    }
}

/// Read the manifest file of an extracted package directory.
pub(crate) fn read_extracted(dir: &Path) -> Result<String, ManifestError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ManifestError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let manifest_path = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .find(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.eq_ignore_ascii_case(MANIFEST_FILE_NAME))
        })
        .ok_or_else(|| ManifestError::MissingManifest {
            path: dir.to_path_buf(),
        })?;

    read_document(&manifest_path)
}

fn read_document(path: &Path) -> Result<String, ManifestError> {
    let bytes = std::fs::read(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_text(&bytes))
}

fn read_archive(path: &Path) -> Result<String, ManifestError> {
    let file = File::open(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut archive = zip::ZipArchive::new(file).map_err(|source| archive_error(path, source))?;

    let entry_name = archive
        .file_names()
        .find(|name| name.eq_ignore_ascii_case(MANIFEST_FILE_NAME))
        .map(str::to_string)
        .ok_or_else(|| ManifestError::MissingManifest {
            path: path.to_path_buf(),
        })?;

    let mut entry = archive
        .by_name(&entry_name)
        .map_err(|source| archive_error(path, source))?;

    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|source| ManifestError::Io {
            path: path.join(&entry_name),
            source,
        })?;

    Ok(decode_text(&bytes))
}

fn archive_error(path: &Path, source: zip::result::ZipError) -> ManifestError {
    ManifestError::Archive {
        path: PathBuf::from(path),
        source,
    }
}

fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.trim_start_matches('\u{feff}').to_string()
}
