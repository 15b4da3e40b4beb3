use crate::response::{Body, PathResponse};
use crate::tile::{Tile, TileBackend};
use crate::{scheme_of, LoadError, PathLoader};
use std::collections::BTreeMap;
use std::sync::Arc;
use tilekit_schema::{normalize_path, Manifest};

/// A tile held entirely in memory: its manifest plus the resource bytes
/// themselves. This is the one backend where content lives next to the
/// manifest instead of behind a hash — trusted, test and demo oriented, no
/// hashing performed.
#[derive(Debug, Clone, Default)]
pub struct MemoryTile {
    pub manifest: Manifest,
    pub bodies: BTreeMap<String, Vec<u8>>,
}

impl MemoryTile {
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            bodies: BTreeMap::new(),
        }
    }

    pub fn insert_body(&mut self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.bodies.insert(normalize_path(path), bytes.into());
    }
}

/// Resolves paths against an in-memory tile.
pub struct MemoryPathLoader {
    tile: Arc<MemoryTile>,
}

impl MemoryPathLoader {
    pub fn new(tile: Arc<MemoryTile>) -> Self {
        Self { tile }
    }
}

impl PathLoader for MemoryPathLoader {
    fn resolve_path(&self, path: &str) -> Result<PathResponse, LoadError> {
        let path = normalize_path(path);
        let Some(bytes) = self.tile.bodies.get(&path) else {
            return Ok(PathResponse::not_found());
        };
        let empty = BTreeMap::new();
        let headers = self
            .tile
            .manifest
            .resource(&path)
            .map_or(&empty, |entry| &entry.headers);
        Ok(PathResponse::found(headers, Body::Bytes(bytes.clone())))
    }
}

/// Loads `memory://<id>` URLs from a registered map of tiles.
#[derive(Default)]
pub struct MemoryBackend {
    tiles: BTreeMap<String, Arc<MemoryTile>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tile(&mut self, id: &str, tile: MemoryTile) {
        self.tiles.insert(id.to_owned(), Arc::new(tile));
    }
}

impl TileBackend for MemoryBackend {
    fn try_load(&self, url: &str) -> Result<Option<Tile>, LoadError> {
        if scheme_of(url) != Some("memory") {
            return Ok(None);
        }
        let rest = url.trim_start_matches("memory://");
        let id = rest.split('/').next().unwrap_or(rest);
        let Some(tile) = self.tiles.get(id) else {
            // Unknown id: let the chain keep looking.
            return Ok(None);
        };
        let loader = MemoryPathLoader::new(Arc::clone(tile));
        Ok(Some(Tile::new(
            url.to_owned(),
            tile.manifest.clone(),
            Box::new(loader),
        )))
    }
}
