//! Binary framed container format for tiles.
//!
//! A container is a single byte stream holding a varint-length-prefixed
//! header block (the canonical-encoded manifest plus framing fields) followed
//! by content blocks, each framed as `varint(len(cid) + len(content))`, the
//! CID bytes, then the content bytes:
//!
//! ```text
//! container     := header-block content-block*
//! header-block  := varint(len) canonical-encoded-manifest
//! content-block := varint(len(cid) + len(content)) cid-bytes content-bytes
//! ```
//!
//! [`TileWriter`] produces containers atomically; [`TileReader`] scans one
//! sequentially into a CID→byte-range index so paths can be resolved with
//! random-access reads, without ever materializing all blocks in memory.

pub mod reader;
pub mod varint;
pub mod writer;

pub use reader::{BlockRange, PathResolution, ResolvedBlock, TileReader};
pub use varint::{encode_varint, read_varint};
pub use writer::TileWriter;

use thiserror::Error;
use tilekit_schema::Cid;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Schema(#[from] tilekit_schema::SchemaError),
    #[error("failed to decode container header: {0}")]
    HeaderDecode(#[from] serde_json::Error),
    #[error("unsupported container version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("container truncated at byte {offset}")]
    Truncated { offset: u64 },
    #[error("varint longer than 10 bytes at byte {offset}")]
    VarintOverflow { offset: u64 },
    #[error("block at byte {offset} is shorter than a content identifier")]
    BlockTooShort { offset: u64 },
    #[error("resource '{path}' has no source file")]
    MissingSource { path: String },
    #[error("manifest references block {cid} for '{path}' but the container has no such block")]
    MissingBlock { path: String, cid: Cid },
}
