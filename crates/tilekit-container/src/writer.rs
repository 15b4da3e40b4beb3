use crate::varint::encode_varint;
use crate::ContainerError;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tilekit_schema::{
    canonical_encode, is_allowed_header, manifest_cid, normalize_path, Cid, Manifest,
    ResourceEntry, SchemaError,
};

/// Builds a tile container from a manifest and per-path source files.
///
/// Resources are added one call at a time and the container is produced by a
/// single [`write`](TileWriter::write). The output is written through a
/// temporary file and only persisted on success, so a failing source read
/// never commits a partial container.
pub struct TileWriter {
    manifest: Manifest,
    sources: BTreeMap<String, PathBuf>,
    order: Vec<String>,
}

impl TileWriter {
    pub fn new(manifest: Manifest) -> Result<Self, ContainerError> {
        let mut writer = Self {
            manifest: Manifest::default(),
            sources: BTreeMap::new(),
            order: Vec::new(),
        };
        writer.set_manifest(manifest)?;
        Ok(writer)
    }

    /// Replace the manifest metadata. Entries already present in
    /// `manifest.resources` keep their headers but still need a source file
    /// registered via [`add_resource`](TileWriter::add_resource) before
    /// writing.
    pub fn set_manifest(&mut self, manifest: Manifest) -> Result<(), ContainerError> {
        for (path, entry) in &manifest.resources {
            check_headers(path, &entry.headers)?;
        }
        self.manifest = manifest;
        Ok(())
    }

    /// Register a resource: its tile path, its transport headers, and the
    /// file its bytes come from. The path is normalized (query/fragment
    /// stripped, leading `/` ensured) and the headers must all be on the
    /// allow-list.
    pub fn add_resource(
        &mut self,
        path: &str,
        headers: BTreeMap<String, String>,
        source: impl Into<PathBuf>,
    ) -> Result<(), ContainerError> {
        let path = normalize_path(path);
        check_headers(&path, &headers)?;
        if !self.sources.contains_key(&path) {
            self.order.push(path.clone());
        }
        self.manifest
            .resources
            .insert(path.clone(), ResourceEntry::new(headers));
        self.sources.insert(path, source.into());
        Ok(())
    }

    /// The manifest as it currently stands. After a successful
    /// [`write`](TileWriter::write), every entry carries its computed CID.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Hash every source, frame the blocks, and persist the container to
    /// `out` atomically. Returns the canonical CID of the logical manifest
    /// (framing fields excluded).
    pub fn write(&mut self, out: &Path) -> Result<Cid, ContainerError> {
        // `/` is written first; everything else keeps insertion order. This
        // ordering only affects I/O locality, never correctness.
        let mut paths: Vec<String> = self
            .manifest
            .resources
            .keys()
            .filter(|p| self.order.iter().any(|o| o == *p))
            .cloned()
            .collect();
        paths.sort_by_key(|p| {
            let rank = usize::from(p != "/");
            let pos = self.order.iter().position(|o| o == p).unwrap_or(usize::MAX);
            (rank, pos)
        });
        for path in self.manifest.resources.keys() {
            if !self.sources.contains_key(path) {
                return Err(ContainerError::MissingSource { path: path.clone() });
            }
        }

        // Content blocks are staged in an unnamed temp file while hashing so
        // the whole output never sits in memory.
        let mut blocks = tempfile::tempfile()?;
        let mut seen = BTreeSet::new();
        for path in &paths {
            let source = &self.sources[path];
            let buf = fs::read(source)?;
            let cid = Cid::compute(&buf);
            tracing::debug!("block {cid} for {path} ({} bytes)", buf.len());
            if let Some(entry) = self.manifest.resources.get_mut(path) {
                entry.src = Some(cid);
            }
            // Two paths with identical content share one block.
            if !seen.insert(cid) {
                continue;
            }
            let mut frame = Vec::new();
            encode_varint((cid.as_bytes().len() + buf.len()) as u64, &mut frame);
            blocks.write_all(&frame)?;
            blocks.write_all(cid.as_bytes())?;
            blocks.write_all(&buf)?;
        }

        let wire = self.manifest.clone().into_wire();
        let header = canonical_encode(&wire)?;

        let dir = out.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        let mut prefix = Vec::new();
        encode_varint(header.len() as u64, &mut prefix);
        tmp.write_all(&prefix)?;
        tmp.write_all(&header)?;
        blocks.seek(SeekFrom::Start(0))?;
        std::io::copy(&mut blocks, tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;
        tmp.persist(out).map_err(|e| ContainerError::Io(e.error))?;

        manifest_cid(&self.manifest).map_err(ContainerError::from)
    }
}

fn check_headers(path: &str, headers: &BTreeMap<String, String>) -> Result<(), ContainerError> {
    for header in headers.keys() {
        if !is_allowed_header(header) {
            return Err(ContainerError::Schema(SchemaError::UnsupportedHeader {
                path: path.to_owned(),
                header: header.clone(),
            }));
        }
    }
    Ok(())
}
