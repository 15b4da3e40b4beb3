use crate::client::{parse_at_url, RepoClient};
use crate::{RemoteError, COLLECTION};
use std::sync::Arc;
use tilekit_loader::{Body, LoadError, PathLoader, PathResponse, Tile, TileBackend};
use tilekit_schema::{normalize_path, validate, Did, Manifest};

fn backend_err(e: RemoteError) -> LoadError {
    LoadError::Backend(Box::new(e))
}

/// Loads `at://<did>/<collection>/<rkey>` URLs from remote repositories.
/// URLs for other collections are left for the rest of the chain. The DID
/// is resolved once at load time and the endpoint kept for the lifetime of
/// the tile.
pub struct RemoteBackend {
    client: Arc<dyn RepoClient>,
}

impl RemoteBackend {
    pub fn new(client: Arc<dyn RepoClient>) -> Self {
        Self { client }
    }
}

impl TileBackend for RemoteBackend {
    fn try_load(&self, url: &str) -> Result<Option<Tile>, LoadError> {
        let Some((did, collection, rkey)) = parse_at_url(url) else {
            return Ok(None);
        };
        if collection != COLLECTION {
            return Ok(None);
        }

        let service = self.client.resolve_service(&did).map_err(backend_err)?;
        let record = self
            .client
            .get_record(&service, &did, COLLECTION, &rkey)
            .map_err(backend_err)?;
        record.verify().map_err(backend_err)?;

        let report = validate(&record.tile);
        if !report.is_ok() {
            return Err(LoadError::Validation(report.errors));
        }

        tracing::debug!("loaded remote tile {url} from {service}");
        let loader = RemotePathLoader {
            client: Arc::clone(&self.client),
            service,
            did,
            manifest: record.tile.clone(),
        };
        Ok(Some(Tile::new(url.to_owned(), record.tile, Box::new(loader))))
    }
}

/// Resolves tile paths by fetching blobs from the repository the tile was
/// loaded from. Every fetched blob is re-hashed and compared against the
/// CID the manifest records; a mismatch is an integrity failure, never
/// silently served.
pub struct RemotePathLoader {
    client: Arc<dyn RepoClient>,
    service: String,
    did: Did,
    manifest: Manifest,
}

impl PathLoader for RemotePathLoader {
    fn resolve_path(&self, path: &str) -> Result<PathResponse, LoadError> {
        let path = normalize_path(path);
        let Some(entry) = self.manifest.resource(&path) else {
            return Ok(PathResponse::not_found());
        };
        let Some(expected) = entry.src else {
            return Ok(PathResponse::not_found());
        };

        let Some(bytes) = self
            .client
            .fetch_blob(&self.service, &self.did, &expected)
            .map_err(backend_err)?
        else {
            return Ok(PathResponse::not_found());
        };

        let actual = tilekit_schema::Cid::compute(&bytes);
        if actual != expected {
            return Err(backend_err(RemoteError::IntegrityFailure {
                key: path,
                expected: expected.to_string(),
                actual: actual.to_string(),
            }));
        }
        Ok(PathResponse::found(&entry.headers, Body::Bytes(bytes)))
    }
}
