//! # `nim.json` source-directory discovery.
//!
//! In watch mode the loader reports the project's source directories to the
//! host so that edits to any module trigger a rebuild. The directories come
//! from the `source-directories` array of `<cwd>/nim.json`:
//!
//! ```json
//! { "source-directories": ["src", "vendor/lib"] }
//! ```
//!
//! Read and parse failures are returned as-is; the loader treats them as fatal.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ManifestError;

/// File name of the project manifest.
pub const MANIFEST_FILE: &str = "nim.json";

#[derive(Deserialize)]
struct NimManifest {
    #[serde(rename = "source-directories")]
    source_directories: Option<Vec<String>>,
}

/// Reads `<cwd>/nim.json` and returns each source directory joined onto `cwd`.
pub fn files_to_watch(cwd: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    let path = cwd.join(MANIFEST_FILE);
    let raw = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
        path: path.clone(),
        source,
    })?;
    let manifest: NimManifest =
        serde_json::from_str(&raw).map_err(|source| ManifestError::Parse {
            path: path.clone(),
            source,
        })?;

    let dirs = manifest
        .source_directories
        .ok_or(ManifestError::MissingSourceDirectories { path })?;

    Ok(dirs.iter().map(|dir| cwd.join(dir)).collect())
}
