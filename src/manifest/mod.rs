//! Module manifest data files
//!
//! This module provides functionality to:
//! - Model data-file values as ordered maps, lists and scalars
//! - Serialize documents into canonical, diff-stable text
//! - Parse data files back, tolerating comments and hand-written forms
//! - Map the typed manifest schema to and from documents
//! - Read and write manifest files with WhatIf support

mod parse;
mod schema;
mod serialize;
mod value;
mod writer;

pub use parse::{parse, parse_value};
pub use schema::{
    declaration_from_value, set_release_version, ManifestInfo, ModuleManifest,
    PLACEHOLDER_VERSION,
};
pub use serialize::{normalize, quote, serialize, serialize_with_indent};
pub use value::{DataMap, DataValue};
pub use writer::{read_document, read_manifest, write_manifest, ManifestWriter, WriteResult};
