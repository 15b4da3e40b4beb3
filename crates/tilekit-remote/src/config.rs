use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

fn default_service() -> String {
    "https://bsky.social".to_owned()
}

fn default_plc_directory() -> String {
    "https://plc.directory".to_owned()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Remote endpoints and request bounds. The service is where the logged-in
/// user's repository lives; the PLC directory resolves other users' DIDs.
/// Every request the client makes is bounded by `timeout_secs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default = "default_plc_directory")]
    pub plc_directory: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            plc_directory: default_plc_directory(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.trim_end_matches('/').to_owned(),
            ..Self::default()
        }
    }

    /// Per-request deadline applied to the HTTP agent.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// App passwords for repository accounts, keyed by handle, stored under
/// the user's config directory. Saves go through a temp file in the same
/// directory so a crash never leaves a half-written credentials file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialStore {
    #[serde(default)]
    pub default_user: Option<String>,
    #[serde(default)]
    accounts: BTreeMap<String, String>,
}

impl CredentialStore {
    /// Load from `path`; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid credentials file: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<(), RemoteError> {
        let parent = path
            .parent()
            .ok_or_else(|| RemoteError::Config(format!("bad credentials path: {}", path.display())))?;
        std::fs::create_dir_all(parent)?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| RemoteError::Io(e.error))?;
        Ok(())
    }

    /// Add an account. The first account added becomes the default user.
    pub fn add(&mut self, handle: &str, password: &str) {
        self.accounts.insert(handle.to_owned(), password.to_owned());
        if self.default_user.is_none() {
            self.default_user = Some(handle.to_owned());
        }
    }

    /// Remove an account; clears the default if it pointed at it. Returns
    /// whether the account existed.
    pub fn remove(&mut self, handle: &str) -> bool {
        let existed = self.accounts.remove(handle).is_some();
        if self.default_user.as_deref() == Some(handle) {
            self.default_user = self.accounts.keys().next().cloned();
        }
        existed
    }

    pub fn password(&self, handle: &str) -> Option<&str> {
        self.accounts.get(handle).map(String::as_str)
    }

    pub fn handles(&self) -> impl Iterator<Item = &str> {
        self.accounts.keys().map(String::as_str)
    }

    pub fn set_default(&mut self, handle: &str) -> Result<(), RemoteError> {
        if !self.accounts.contains_key(handle) {
            return Err(RemoteError::Config(format!("no credentials for '{handle}'")));
        }
        self.default_user = Some(handle.to_owned());
        Ok(())
    }

    /// Pick the requested account, or the default when none is requested.
    pub fn resolve_user<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> Result<(&'a str, &'a str), RemoteError> {
        let handle = match requested {
            Some(h) => h,
            None => self
                .default_user
                .as_deref()
                .ok_or_else(|| RemoteError::Config("no default user; log in first".to_owned()))?,
        };
        let password = self
            .password(handle)
            .ok_or_else(|| RemoteError::Config(format!("no credentials for '{handle}'")))?;
        Ok((handle, password))
    }
}

/// `~/.config/tilekit/credentials.json`
pub fn default_credentials_path() -> Result<PathBuf, RemoteError> {
    Ok(config_dir()?.join("credentials.json"))
}

/// `~/.config/tilekit/stable-ids.json`
pub fn default_stable_ids_path() -> Result<PathBuf, RemoteError> {
    Ok(config_dir()?.join("stable-ids.json"))
}

fn config_dir() -> Result<PathBuf, RemoteError> {
    let home = std::env::var("HOME").map_err(|_| RemoteError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/tilekit"))
}
