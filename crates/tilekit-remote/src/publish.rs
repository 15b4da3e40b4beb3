use crate::client::RepoClient;
use crate::record::TileRecord;
use crate::{RemoteError, COLLECTION};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tilekit_schema::{
    normalize_path, parse_manifest_file, validate, Cid, Manifest, RecordKey,
};

/// Content type guessed from a file extension when the manifest does not
/// declare one for the resource.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js" | "mjs") => "text/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain",
        Some("wasm") => "application/wasm",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Progress of a running publish, reported as it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishEvent {
    Warning { message: String },
    UploadStarted { path: String },
    UploadCompleted { path: String },
    UploadFailed { path: String, reason: String },
    Published { uri: String },
}

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Record key to write under. `None` lets the server assign one; a
    /// stable key makes re-publishing overwrite the same record.
    pub rkey: Option<RecordKey>,
}

/// Outcome of a successful publish.
#[derive(Debug, Clone)]
pub struct PublishedTile {
    pub uri: String,
    pub rkey: RecordKey,
    pub cid: Cid,
}

/// Handle on an in-flight publish. Iterate [`events`](Self::events) for
/// progress, then [`finish`](Self::finish) for the outcome.
pub struct PublishProgress {
    events: mpsc::Receiver<PublishEvent>,
    worker: thread::JoinHandle<Result<PublishedTile, RemoteError>>,
}

impl PublishProgress {
    /// Iterator over progress events. Blocks between events and ends when
    /// the publish is done.
    pub fn events(&self) -> impl Iterator<Item = PublishEvent> + '_ {
        self.events.iter()
    }

    /// Wait for the publish to complete and return its outcome. Any
    /// unconsumed events are discarded.
    pub fn finish(self) -> Result<PublishedTile, RemoteError> {
        for _ in self.events.iter() {}
        self.worker
            .join()
            .map_err(|_| RemoteError::Internal("publish worker panicked".to_owned()))?
    }
}

struct Upload {
    path: String,
    file: PathBuf,
    cid: Cid,
    content_type: String,
}

/// Publishes a directory of files as a tile record: each file becomes a
/// CID-addressed blob, `/index.html` becomes the root resource, and the
/// finished manifest is written as a record in the tile collection.
pub struct TilePublisher {
    manifest: Manifest,
    sources: BTreeMap<String, PathBuf>,
}

impl TilePublisher {
    /// Build a publisher from a directory containing `manifest.json` plus
    /// the resource files. Resource CIDs are computed here; headers
    /// declared in the manifest win over guessed content types.
    pub fn from_directory(dir: &Path) -> Result<Self, RemoteError> {
        let manifest_path = dir.join("manifest.json");
        if !manifest_path.is_file() {
            return Err(RemoteError::Config(format!(
                "no manifest.json in {}",
                dir.display()
            )));
        }
        let mut manifest = parse_manifest_file(&manifest_path)?;

        let mut files = Vec::new();
        collect_files(dir, dir, &mut files)?;

        let mut sources = BTreeMap::new();
        for file in files {
            let rel = file
                .strip_prefix(dir)
                .map_err(|e| RemoteError::Config(e.to_string()))?;
            let mut path = normalize_path(&format!("/{}", rel.display()));
            if path == "/index.html" {
                path = "/".to_owned();
            }

            let bytes = std::fs::read(&file)?;
            let cid = Cid::compute(&bytes);
            let entry = manifest.resources.entry(path.clone()).or_default();
            entry.src = Some(cid);
            if !entry.headers.contains_key("content-type") {
                entry
                    .headers
                    .insert("content-type".to_owned(), content_type_for(&file).to_owned());
            }
            sources.insert(path, file);
        }

        Ok(Self { manifest, sources })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The scanned manifest and path-to-file map, for callers that want to
    /// package the directory some other way than publishing it.
    pub fn into_parts(self) -> (Manifest, BTreeMap<String, PathBuf>) {
        (self.manifest, self.sources)
    }

    /// Run the publish on a worker thread. Validation failures abort
    /// before any network I/O; a failed upload fails the whole publish and
    /// no record is written, though sibling uploads already in flight run
    /// to completion.
    pub fn publish(self, client: Arc<dyn RepoClient>, options: PublishOptions) -> PublishProgress {
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || self.run(&client, options, &tx));
        PublishProgress { events: rx, worker }
    }

    fn run(
        self,
        client: &Arc<dyn RepoClient>,
        options: PublishOptions,
        tx: &mpsc::Sender<PublishEvent>,
    ) -> Result<PublishedTile, RemoteError> {
        let report = validate(&self.manifest);
        for warning in &report.warnings {
            let _ = tx.send(PublishEvent::Warning {
                message: warning.to_string(),
            });
        }
        if !report.is_ok() {
            return Err(RemoteError::Validation(report.errors));
        }

        let mut uploads = Vec::new();
        for (path, entry) in &self.manifest.resources {
            let Some(cid) = entry.src else {
                return Err(RemoteError::Config(format!(
                    "resource '{path}' has no source file"
                )));
            };
            let Some(file) = self.sources.get(path) else {
                return Err(RemoteError::Config(format!(
                    "resource '{path}' has no source file"
                )));
            };
            uploads.push(Upload {
                path: path.clone(),
                file: file.clone(),
                cid,
                content_type: entry
                    .headers
                    .get("content-type")
                    .cloned()
                    .unwrap_or_else(|| "application/octet-stream".to_owned()),
            });
        }

        let results: Vec<Result<(), RemoteError>> = thread::scope(|s| {
            let handles: Vec<_> = uploads
                .iter()
                .map(|upload| {
                    let tx = tx.clone();
                    s.spawn(move || upload_one(client.as_ref(), upload, &tx))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(RemoteError::Internal("upload worker panicked".to_owned()))
                    })
                })
                .collect()
        });
        for result in results {
            result?;
        }

        let record = TileRecord::new(self.manifest)?;
        let cid = record.cid;
        let record_ref = client.put_record(COLLECTION, options.rkey.as_ref(), &record)?;
        tracing::info!("published tile at {}", record_ref.uri);
        let _ = tx.send(PublishEvent::Published {
            uri: record_ref.uri.clone(),
        });
        Ok(PublishedTile {
            uri: record_ref.uri,
            rkey: record_ref.rkey,
            cid,
        })
    }
}

fn upload_one(
    client: &dyn RepoClient,
    upload: &Upload,
    tx: &mpsc::Sender<PublishEvent>,
) -> Result<(), RemoteError> {
    let _ = tx.send(PublishEvent::UploadStarted {
        path: upload.path.clone(),
    });
    let result = (|| {
        let bytes = std::fs::read(&upload.file)?;
        let remote = client.upload_blob(&bytes, &upload.content_type)?;
        if remote != upload.cid {
            return Err(RemoteError::IntegrityFailure {
                key: upload.path.clone(),
                expected: upload.cid.to_string(),
                actual: remote.to_string(),
            });
        }
        Ok(())
    })();
    let event = match &result {
        Ok(()) => PublishEvent::UploadCompleted {
            path: upload.path.clone(),
        },
        Err(e) => PublishEvent::UploadFailed {
            path: upload.path.clone(),
            reason: e.to_string(),
        },
    };
    let _ = tx.send(event);
    result
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RemoteError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        // Dotfiles never ship; the manifest itself travels in the record.
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if !(dir == root && name == "manifest.json") {
            out.push(path);
        }
    }
    Ok(())
}
