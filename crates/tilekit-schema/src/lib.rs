//! Manifest model, content identifiers, canonical encoding, and validation for tilekit.
//!
//! This crate defines the schema layer: the tile `Manifest` and its resource
//! map, blake3-backed content identifiers (`Cid`), the deterministic canonical
//! encoding used for identity hashing (`canonical_encode`, `manifest_cid`),
//! the transport header allow-list, and the shared manifest validator used by
//! both the publish and load paths.

pub mod canonical;
pub mod cid;
pub mod headers;
pub mod manifest;
pub mod types;
pub mod validate;

pub use canonical::{canonical_encode, manifest_cid};
pub use cid::{Cid, ParseCidError, CID_LEN};
pub use headers::{filter_headers, is_allowed_header, ALLOWED_HEADERS};
pub use manifest::{
    check_entry_headers, normalize_path, parse_manifest_file, parse_manifest_str, ImageResource,
    Manifest,
    ResourceEntry, Sizing, WireManifest, CONTAINER_VERSION,
};
pub use types::{Did, RecordKey};
pub use validate::{validate, ValidationError, ValidationReport, ValidationWarning};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported header '{header}' on resource '{path}'")]
    UnsupportedHeader { path: String, header: String },
    #[error("invalid content identifier: {0}")]
    Cid(#[from] ParseCidError),
}
