use crate::RemoteError;
use fs2::FileExt;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tilekit_schema::RecordKey;

/// Record keys remembered per published directory, so re-publishing the
/// same directory overwrites the same record instead of minting a new one.
/// The map lives in one JSON file; writes take an exclusive lock on a
/// sibling lock file so concurrent publishes cannot clobber each other.
pub struct StableIdMap {
    path: PathBuf,
    entries: BTreeMap<String, RecordKey>,
}

impl StableIdMap {
    pub fn open(path: &Path) -> Result<Self, RemoteError> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)
                .map_err(|e| RemoteError::Config(format!("invalid stable-id file: {e}")))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_owned(),
            entries,
        })
    }

    pub fn get(&self, dir: &Path) -> Option<&RecordKey> {
        let key = dir_key(dir).ok()?;
        self.entries.get(&key)
    }

    /// Remember `rkey` for `dir` and write the map back out.
    pub fn record(&mut self, dir: &Path, rkey: RecordKey) -> Result<(), RemoteError> {
        let key = dir_key(dir)?;
        self.entries.insert(key, rkey);
        self.save()
    }

    fn save(&self) -> Result<(), RemoteError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| RemoteError::Config(format!("bad stable-id path: {}", self.path.display())))?;
        std::fs::create_dir_all(parent)?;

        let lock_path = self.path.with_extension("lock");
        let lock = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        lock.lock_exclusive()?;

        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| RemoteError::Io(e.error))?;
        // Lock released when `lock` drops.
        Ok(())
    }
}

fn dir_key(dir: &Path) -> Result<String, RemoteError> {
    let canonical = std::fs::canonicalize(dir)?;
    Ok(canonical.to_string_lossy().into_owned())
}
