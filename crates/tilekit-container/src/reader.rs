use crate::varint::read_varint;
use crate::ContainerError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tilekit_schema::{
    check_entry_headers, filter_headers, normalize_path, Cid, Manifest, WireManifest, CID_LEN,
    CONTAINER_VERSION,
};

/// Inclusive byte range `[start, end]` of one block's content within the
/// container file. The CID prefix is excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

impl BlockRange {
    pub fn len(&self) -> u64 {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Random-access reader over a tile container.
///
/// `open` scans the file once, strictly sequentially, recording each block's
/// CID and byte range; the content bytes are not retained, so memory use is
/// proportional to the number of resources, not their total size. The index
/// is written once during `open` and read-only afterwards, which makes
/// concurrent `resolve_path` calls on one reader safe. Parallel scanning of
/// a single handle is not — use independent readers instead.
#[derive(Debug)]
pub struct TileReader {
    file: File,
    manifest: Manifest,
    index: BTreeMap<Cid, BlockRange>,
}

/// Outcome of resolving a path against an open container.
#[derive(Debug)]
pub enum PathResolution {
    /// The manifest has no such path (or no CID for it yet). Not an error.
    NotFound,
    Found(ResolvedBlock),
}

/// A resolved resource: its filtered transport headers and a bounded
/// byte-range accessor over the container file.
#[derive(Debug)]
pub struct ResolvedBlock {
    file: File,
    pub cid: Cid,
    pub range: BlockRange,
    pub headers: BTreeMap<String, String>,
}

impl ResolvedBlock {
    /// A reader scoped to exactly this block's content bytes.
    pub fn reader(&self) -> std::io::Result<impl Read> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(self.range.start))?;
        Ok(file.take(self.range.len()))
    }

    /// Convenience for callers that want the whole content at once.
    pub fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.range.len() as usize);
        self.reader()?.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl TileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let file = File::open(path)?;
        let mut scan = BufReader::new(file.try_clone()?);

        let Some((header_len, prefix_len)) = read_varint(&mut scan, 0)? else {
            return Err(ContainerError::Truncated { offset: 0 });
        };
        let mut header = vec![0u8; header_len as usize];
        scan.read_exact(&mut header)
            .map_err(|_| ContainerError::Truncated { offset: prefix_len as u64 })?;
        let wire: WireManifest = serde_json::from_slice(&header)?;
        if wire.version != CONTAINER_VERSION {
            return Err(ContainerError::UnsupportedVersion(wire.version));
        }
        // `version` and `roots` are framing artifacts; only the logical
        // manifest is handed to callers. The header allow-list holds on this
        // ingest path too, not just for manifests parsed from JSON text.
        let manifest = wire.manifest;
        check_entry_headers(&manifest)?;

        let mut index = BTreeMap::new();
        let mut offset = prefix_len as u64 + header_len;
        while let Some((block_len, varint_len)) = read_varint(&mut scan, offset)? {
            if block_len < CID_LEN as u64 {
                return Err(ContainerError::BlockTooShort { offset });
            }
            let mut cid_bytes = [0u8; CID_LEN];
            scan.read_exact(&mut cid_bytes)
                .map_err(|_| ContainerError::Truncated { offset })?;
            let cid = Cid::from_bytes(cid_bytes);
            let content_len = block_len - CID_LEN as u64;
            let start = offset + varint_len as u64 + CID_LEN as u64;
            index.insert(
                cid,
                BlockRange {
                    start,
                    end: start + content_len - 1,
                },
            );
            scan.seek_relative(content_len as i64)
                .map_err(|_| ContainerError::Truncated { offset })?;
            offset = start + content_len;
        }
        // Seeking past EOF succeeds and the next varint read then looks like
        // a clean end of stream, so a file cut mid-content-block only shows
        // up here: the scan must have consumed exactly the file's length or
        // the last indexed range extends beyond the bytes that exist.
        let file_len = file.metadata()?.len();
        if offset > file_len {
            return Err(ContainerError::Truncated { offset: file_len });
        }
        tracing::debug!("indexed {} blocks", index.len());

        Ok(Self {
            file,
            manifest,
            index,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Number of indexed content blocks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Resolve a tile path to its block. Query string and fragment are
    /// stripped first. A path the manifest does not know is `NotFound`; a
    /// path whose CID is missing from the block index means the container
    /// itself is broken, which is a distinct, fatal error.
    pub fn resolve_path(&self, path: &str) -> Result<PathResolution, ContainerError> {
        let path = normalize_path(path);
        let Some(entry) = self.manifest.resources.get(&path) else {
            return Ok(PathResolution::NotFound);
        };
        let Some(cid) = entry.src else {
            return Ok(PathResolution::NotFound);
        };
        let Some(range) = self.index.get(&cid) else {
            return Err(ContainerError::MissingBlock { path, cid });
        };
        Ok(PathResolution::Found(ResolvedBlock {
            file: self.file.try_clone()?,
            cid,
            range: *range,
            headers: filter_headers(&entry.headers),
        }))
    }
}
