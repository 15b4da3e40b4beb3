use crate::cid::Cid;
use crate::headers::is_allowed_header;
use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Container framing version. Always written as `1`, stripped on read.
pub const CONTAINER_VERSION: u32 = 1;

/// Tile metadata: naming, presentation hints, and the map of resource paths
/// to content identifiers and transport headers.
///
/// A manifest is built incrementally by a writer, parsed wholesale by a
/// reader, or fetched as a record from a remote repository. It is immutable
/// once handed to a path loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub icons: Vec<ImageResource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<ImageResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizing: Option<Sizing>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceEntry>,
    /// Link to the previous version of this tile, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<Cid>,
}

/// An icon or screenshot reference. `src` must be a key of `resources`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageResource {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Requested sizing for the rendered content. Both dimensions are required
/// when the object is present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sizing {
    pub width: u32,
    pub height: u32,
}

/// One entry in the resource map: the content hash link plus allow-listed
/// transport headers, flattened into the same object on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Content identifier of the resource bytes. `None` until a writer has
    /// hashed the source content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<Cid>,
    #[serde(flatten)]
    pub headers: BTreeMap<String, String>,
}

impl ResourceEntry {
    pub fn new(headers: BTreeMap<String, String>) -> Self {
        Self { src: None, headers }
    }
}

impl Manifest {
    pub fn resource(&self, path: &str) -> Option<&ResourceEntry> {
        self.resources.get(path)
    }

    /// Wrap in the container framing envelope (`version`/`roots`).
    pub fn into_wire(self) -> WireManifest {
        WireManifest {
            version: CONTAINER_VERSION,
            roots: Vec::new(),
            manifest: self,
        }
    }
}

/// The manifest as framed inside a container: the logical manifest plus the
/// write-time `version` and `roots` fields. Readers strip the envelope and
/// hand callers only the inner [`Manifest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireManifest {
    pub version: u32,
    #[serde(default)]
    pub roots: Vec<Cid>,
    #[serde(flatten)]
    pub manifest: Manifest,
}

/// Parse a manifest from JSON text, rejecting resource entries that carry
/// headers outside the allow-list.
pub fn parse_manifest_str(input: &str) -> Result<Manifest, SchemaError> {
    let manifest: Manifest = serde_json::from_str(input)?;
    check_entry_headers(&manifest)?;
    Ok(manifest)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<Manifest, SchemaError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}

/// Reject any resource entry carrying a header outside the allow-list. Runs
/// on every ingest path, whether the manifest came from JSON text or a
/// container header block.
pub fn check_entry_headers(manifest: &Manifest) -> Result<(), SchemaError> {
    for (path, entry) in &manifest.resources {
        for header in entry.headers.keys() {
            if !is_allowed_header(header) {
                return Err(SchemaError::UnsupportedHeader {
                    path: path.clone(),
                    header: header.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Reduce a resource path to its path component: strip query string and
/// fragment, ensure a leading `/`.
pub fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = &path[..end];
    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}
