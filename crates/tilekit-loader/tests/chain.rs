//! End-to-end loading through the backend chain.

use std::collections::BTreeMap;
use std::fs;
use tilekit_container::TileWriter;
use tilekit_loader::{ContainerBackend, MemoryBackend, MemoryTile, TileLoader};
use tilekit_schema::{parse_manifest_str, Cid, Manifest};

fn headers(content_type: &str) -> BTreeMap<String, String> {
    let mut h = BTreeMap::new();
    h.insert("content-type".to_owned(), content_type.to_owned());
    h
}

fn chain_with_fixture(dir: &std::path::Path) -> (TileLoader, String) {
    let index = dir.join("index.html");
    fs::write(&index, b"<!doctype html><p>first tile</p>").unwrap();
    let img = dir.join("x.jpg");
    fs::write(&img, b"\xff\xd8 image bytes").unwrap();

    let mut writer = TileWriter::new(Manifest {
        name: "First Tile".to_owned(),
        ..Manifest::default()
    })
    .unwrap();
    writer.add_resource("/", headers("text/html"), &index).unwrap();
    writer
        .add_resource("/img/x.jpg", headers("image/jpeg"), &img)
        .unwrap();
    let out = dir.join("first.tile");
    writer.write(&out).unwrap();

    let memory_tile = {
        let manifest = parse_manifest_str(
            r#"{"name":"Mem","resources":{"/":{"content-type":"text/plain"}}}"#,
        )
        .unwrap();
        let mut tile = MemoryTile::new(manifest);
        tile.insert_body("/", b"from memory".to_vec());
        tile
    };
    let mut memory = MemoryBackend::new();
    memory.add_tile("demo", memory_tile);

    let mut chain = TileLoader::new();
    chain.add_backend(Box::new(memory));
    chain.add_backend(Box::new(ContainerBackend::new()));
    (chain, format!("container://{}", out.display()))
}

#[test]
fn container_url_skips_memory_backend() {
    let dir = tempfile::tempdir().unwrap();
    let (chain, url) = chain_with_fixture(dir.path());

    let tile = chain.load_tile(&url).unwrap().expect("container tile");
    assert_eq!(tile.manifest().name, "First Tile");

    let resp = tile.resolve_path("/").unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.headers.get("content-type").unwrap(), "text/html");
    assert_eq!(
        resp.body.into_bytes().unwrap(),
        b"<!doctype html><p>first tile</p>"
    );
}

#[test]
fn memory_url_resolves_through_same_chain() {
    let dir = tempfile::tempdir().unwrap();
    let (chain, _) = chain_with_fixture(dir.path());

    let tile = chain.load_tile("memory://demo").unwrap().expect("memory tile");
    let resp = tile.resolve_path("/").unwrap();
    assert_eq!(resp.body.into_bytes().unwrap(), b"from memory");
}

#[test]
fn unrecognized_scheme_is_not_found_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let (chain, _) = chain_with_fixture(dir.path());
    assert!(chain.load_tile("gemini://space").unwrap().is_none());
}

#[test]
fn resolved_image_hashes_to_manifest_cid() {
    let dir = tempfile::tempdir().unwrap();
    let (chain, url) = chain_with_fixture(dir.path());
    let tile = chain.load_tile(&url).unwrap().unwrap();

    let recorded = tile
        .manifest()
        .resource("/img/x.jpg")
        .unwrap()
        .src
        .expect("cid recorded at write time");
    let resp = tile.resolve_path("/img/x.jpg").unwrap();
    let bytes = resp.body.into_bytes().unwrap();
    assert_eq!(Cid::compute(&bytes), recorded);
}

#[test]
fn every_backend_returns_404_for_missing_paths() {
    let dir = tempfile::tempdir().unwrap();
    let (chain, url) = chain_with_fixture(dir.path());

    for target in [chain.load_tile(&url), chain.load_tile("memory://demo")] {
        let tile = target.unwrap().unwrap();
        let resp = tile.resolve_path("/missing").unwrap();
        assert!(!resp.ok());
        assert_eq!(resp.status, 404);
    }
}
