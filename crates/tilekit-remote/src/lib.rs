//! Remote tile repositories: publishing tiles as records with blob uploads,
//! and loading them back over the `at://` URL scheme.
//!
//! A published tile is a record in a repository collection holding the
//! manifest plus its CID, with every resource body uploaded as a separate
//! content-addressed blob. [`RepoClient`] abstracts the repository HTTP API
//! so publishing and loading can be tested against in-memory fakes.

pub mod client;
pub mod config;
pub mod loader;
pub mod publish;
pub mod record;
pub mod stable;

pub use client::{HttpRepoClient, RecordRef, RepoClient, Session};
pub use config::{CredentialStore, RemoteConfig};
pub use loader::{RemoteBackend, RemotePathLoader};
pub use publish::{PublishEvent, PublishOptions, PublishProgress, PublishedTile, TilePublisher};
pub use record::TileRecord;
pub use stable::StableIdMap;

/// Collection tile records are published under.
pub const COLLECTION: &str = "ing.dasl.tile";

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error(transparent)]
    Schema(#[from] tilekit_schema::SchemaError),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("manifest failed validation: {}", format_errors(.0))]
    Validation(Vec<tilekit_schema::ValidationError>),
    #[error("integrity failure for '{key}': expected {expected}, got {actual}")]
    IntegrityFailure {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_errors(errors: &[tilekit_schema::ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
