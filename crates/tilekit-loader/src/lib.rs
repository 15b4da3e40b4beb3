//! Path resolution over heterogeneous tile storage backends.
//!
//! Every backend — an in-memory map, a container file, a remote repository —
//! satisfies the same contract: [`PathLoader::resolve_path`] turns a tile
//! path into a [`PathResponse`] (200 with filtered headers and a body, or
//! 404). [`TileLoader`] chains URL-scheme-specific backends and produces a
//! bound [`Tile`] from the first one that recognizes a URL.

pub mod container;
pub mod memory;
pub mod response;
pub mod tile;

pub use container::{ContainerBackend, ContainerPathLoader};
pub use memory::{MemoryBackend, MemoryPathLoader, MemoryTile};
pub use response::{Body, PathResponse};
pub use tile::{Tile, TileBackend, TileLoader};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("loader I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Container(#[from] tilekit_container::ContainerError),
    #[error(transparent)]
    Schema(#[from] tilekit_schema::SchemaError),
    #[error("manifest failed validation: {}", format_errors(.0))]
    Validation(Vec<tilekit_schema::ValidationError>),
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn format_errors(errors: &[tilekit_schema::ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Per-storage-medium path resolution. A missing path is a 404 response,
/// never an error; errors are reserved for broken storage.
pub trait PathLoader: Send + Sync {
    fn resolve_path(&self, path: &str) -> Result<PathResponse, LoadError>;
}

/// The scheme of a URL, if it has one: everything before the first `:`.
pub(crate) fn scheme_of(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once(':')?;
    if scheme.is_empty()
        || !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
    {
        return None;
    }
    Some(scheme)
}
