pub mod completions;
pub mod default_user;
pub mod inspect;
pub mod login;
pub mod logout;
pub mod pack;
pub mod publish;
pub mod resolve;
pub mod users;

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tilekit_remote::config::default_credentials_path;
use tilekit_remote::{CredentialStore, HttpRepoClient, RemoteConfig};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_CONFIG_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn client_for(service: Option<&str>) -> HttpRepoClient {
    let config = match service {
        Some(url) => RemoteConfig::with_service(url),
        None => RemoteConfig::default(),
    };
    HttpRepoClient::new(&config)
}

pub fn credentials_path() -> Result<PathBuf, String> {
    default_credentials_path().map_err(|e| e.to_string())
}

pub fn load_credentials() -> Result<(PathBuf, CredentialStore), String> {
    let path = credentials_path()?;
    let store = CredentialStore::load(&path).map_err(|e| e.to_string())?;
    Ok((path, store))
}
