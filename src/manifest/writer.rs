//! Manifest file reading and writing
//!
//! This module provides:
//! - ManifestWriter for persisting canonical manifest documents
//! - WhatIf mode support (no actual file modifications)
//! - Change detection so unchanged manifests are not rewritten

use super::parse::parse;
use super::serialize::serialize;
use super::value::DataMap;
use crate::error::ManifestError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writer for manifest files
pub struct ManifestWriter {
    /// Whether to run in WhatIf mode (no file modifications)
    what_if: bool,
}

/// Result of writing one manifest
#[derive(Debug)]
pub struct WriteResult {
    /// Path to the manifest file
    pub path: PathBuf,
    /// Canonical text of the document
    pub content: String,
    /// Whether the canonical text differs from what was on disk
    pub changed: bool,
    /// Whether the file was actually written
    pub file_modified: bool,
}

impl ManifestWriter {
    /// Create a new ManifestWriter
    pub fn new(what_if: bool) -> Self {
        Self { what_if }
    }

    /// Create a ManifestWriter in WhatIf mode
    pub fn what_if() -> Self {
        Self { what_if: true }
    }

    /// Check if this writer is in WhatIf mode
    pub fn is_what_if(&self) -> bool {
        self.what_if
    }

    /// Serialize `doc` and write it to `path` unless the content is unchanged
    pub fn write_document(&self, path: &Path, doc: &DataMap) -> Result<WriteResult, ManifestError> {
        let content = serialize(doc);
        let existing = match fs::read_to_string(path) {
            Ok(existing) => Some(existing),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(ManifestError::read_error(path, e)),
        };
        let changed = existing.as_deref() != Some(content.as_str());

        let mut file_modified = false;
        if !changed {
            debug!(path = %path.display(), "manifest unchanged");
        } else if self.what_if {
            info!(path = %path.display(), "what-if: would write manifest");
        } else {
            write_manifest(path, &content)?;
            file_modified = true;
        }

        Ok(WriteResult {
            path: path.to_path_buf(),
            content,
            changed,
            file_modified,
        })
    }
}

/// Read a manifest file content safely
pub fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ManifestError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ManifestError::read_error(path, e)
        }
    })
}

/// Read and parse a manifest file
pub fn read_document(path: &Path) -> Result<DataMap, ManifestError> {
    let content = read_manifest(path)?;
    parse(&content).map_err(|e| e.in_file(path))
}

/// Write content to a manifest file
pub fn write_manifest(path: &Path, content: &str) -> Result<(), ManifestError> {
    fs::write(path, content).map_err(|e| ManifestError::write_error(path, e))
}
