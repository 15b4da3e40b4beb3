use crate::response::PathResponse;
use crate::{LoadError, PathLoader};
use tilekit_schema::{normalize_path, Manifest};

/// A loaded, usable tile: its URL, its manifest, and a bound path loader.
/// All `resolve_path` calls are normalized (query/fragment stripped) before
/// delegation, so backends only ever see clean paths.
pub struct Tile {
    url: String,
    manifest: Manifest,
    loader: Box<dyn PathLoader>,
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("url", &self.url)
            .field("manifest", &self.manifest)
            .finish_non_exhaustive()
    }
}

impl Tile {
    pub fn new(url: String, manifest: Manifest, loader: Box<dyn PathLoader>) -> Self {
        Self {
            url,
            manifest,
            loader,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn resolve_path(&self, path: &str) -> Result<PathResponse, LoadError> {
        self.loader.resolve_path(&normalize_path(path))
    }
}

/// A backend that may recognize a URL and produce a tile from it. Backends
/// own their scheme predicate; `Ok(None)` means "not mine, keep looking".
pub trait TileBackend: Send + Sync {
    fn try_load(&self, url: &str) -> Result<Option<Tile>, LoadError>;
}

/// Ordered chain of tile backends. The first backend that recognizes a URL
/// and produces a tile wins; a URL no backend matches yields `Ok(None)`,
/// which callers treat as not-found rather than an error.
#[derive(Default)]
pub struct TileLoader {
    backends: Vec<Box<dyn TileBackend>>,
}

impl TileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_backend(&mut self, backend: Box<dyn TileBackend>) {
        self.backends.push(backend);
    }

    pub fn load_tile(&self, url: &str) -> Result<Option<Tile>, LoadError> {
        for backend in &self.backends {
            if let Some(tile) = backend.try_load(url)? {
                tracing::debug!("loaded tile from {url}");
                return Ok(Some(tile));
            }
        }
        Ok(None)
    }
}
