use crate::response::{Body, PathResponse};
use crate::tile::{Tile, TileBackend};
use crate::{scheme_of, LoadError, PathLoader};
use std::path::Path;
use tilekit_container::{PathResolution, TileReader};
use tilekit_schema::validate;

/// Resolves paths out of an open container file by delegating to the
/// reader's CID index. Integrity is implicitly trusted here: the bytes come
/// from a CID-indexed block the local process wrote or fetched itself.
pub struct ContainerPathLoader {
    reader: TileReader,
}

impl ContainerPathLoader {
    pub fn new(reader: TileReader) -> Self {
        Self { reader }
    }
}

impl PathLoader for ContainerPathLoader {
    fn resolve_path(&self, path: &str) -> Result<PathResponse, LoadError> {
        match self.reader.resolve_path(path)? {
            PathResolution::NotFound => Ok(PathResponse::not_found()),
            PathResolution::Found(block) => {
                let stream: Box<dyn std::io::Read + Send> = Box::new(block.reader()?);
                Ok(PathResponse::found(&block.headers, Body::Stream(stream)))
            }
        }
    }
}

/// Loads `container://<path>` URLs, plus `file://` URLs pointing at `.tile`
/// files. Opening and validating the container happens at load time, so a
/// broken or invalid tile fails here rather than at first resolution.
#[derive(Debug, Default)]
pub struct ContainerBackend;

impl ContainerBackend {
    pub fn new() -> Self {
        Self
    }

    fn file_path(url: &str) -> Option<&str> {
        if let Some(rest) = url.strip_prefix("container://") {
            return Some(rest);
        }
        url.strip_prefix("file://")
            .filter(|rest| Path::new(rest).extension().is_some_and(|e| e == "tile"))
    }
}

impl TileBackend for ContainerBackend {
    fn try_load(&self, url: &str) -> Result<Option<Tile>, LoadError> {
        if !matches!(scheme_of(url), Some("container" | "file")) {
            return Ok(None);
        }
        let Some(path) = Self::file_path(url) else {
            return Ok(None);
        };
        let reader = TileReader::open(path)?;
        let report = validate(reader.manifest());
        if !report.is_ok() {
            return Err(LoadError::Validation(report.errors));
        }
        let manifest = reader.manifest().clone();
        Ok(Some(Tile::new(
            url.to_owned(),
            manifest,
            Box::new(ContainerPathLoader::new(reader)),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;
    use tilekit_container::TileWriter;
    use tilekit_schema::Manifest;

    fn headers(content_type: &str) -> BTreeMap<String, String> {
        let mut h = BTreeMap::new();
        h.insert("content-type".to_owned(), content_type.to_owned());
        h
    }

    fn write_tile(dir: &Path, name: &str) -> PathBuf {
        let index = dir.join("index.html");
        fs::write(&index, b"<html>container</html>").unwrap();
        let mut writer = TileWriter::new(Manifest {
            name: "Container Tile".to_owned(),
            ..Manifest::default()
        })
        .unwrap();
        writer.add_resource("/", headers("text/html"), &index).unwrap();
        let out = dir.join(name);
        writer.write(&out).unwrap();
        out
    }

    #[test]
    fn loads_container_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let tile_path = write_tile(dir.path(), "a.tile");
        let backend = ContainerBackend::new();
        let url = format!("container://{}", tile_path.display());
        let tile = backend.try_load(&url).unwrap().unwrap();
        assert_eq!(tile.manifest().name, "Container Tile");
        let resp = tile.resolve_path("/").unwrap();
        assert!(resp.ok());
        assert_eq!(resp.body.into_bytes().unwrap(), b"<html>container</html>");
    }

    #[test]
    fn loads_file_scheme_for_tile_extension_only() {
        let dir = tempfile::tempdir().unwrap();
        let tile_path = write_tile(dir.path(), "b.tile");
        let backend = ContainerBackend::new();
        let url = format!("file://{}", tile_path.display());
        assert!(backend.try_load(&url).unwrap().is_some());
        assert!(backend.try_load("file:///etc/hosts").unwrap().is_none());
    }

    #[test]
    fn other_scheme_is_skipped() {
        let backend = ContainerBackend::new();
        assert!(backend.try_load("memory://demo").unwrap().is_none());
    }

    #[test]
    fn invalid_manifest_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index.html");
        fs::write(&index, b"<html/>").unwrap();
        // No name: validation must reject this at load time.
        let mut writer = TileWriter::new(Manifest::default()).unwrap();
        writer.add_resource("/", headers("text/html"), &index).unwrap();
        let out = dir.path().join("nameless.tile");
        writer.write(&out).unwrap();

        let backend = ContainerBackend::new();
        let err = backend
            .try_load(&format!("container://{}", out.display()))
            .unwrap_err();
        assert!(matches!(err, LoadError::Validation(_)));
    }

    #[test]
    fn missing_file_is_an_error() {
        let backend = ContainerBackend::new();
        assert!(backend.try_load("container:///no/such.tile").is_err());
    }
}
