use super::{
    client_for, json_pretty, load_credentials, spin_fail, spin_ok, spinner, EXIT_SUCCESS,
};
use console::Style;
use std::path::Path;
use std::sync::Arc;
use tilekit_remote::config::default_stable_ids_path;
use tilekit_remote::{PublishEvent, PublishOptions, StableIdMap, TilePublisher};

pub fn run(
    dir: &Path,
    user: Option<&str>,
    stable_id: bool,
    service: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let (_, store) = load_credentials()?;
    let (handle, password) = store.resolve_user(user).map_err(|e| e.to_string())?;

    let mut client = client_for(service);
    let pb = spinner(&format!("logging in as {handle}…"));
    client.login(handle, password).map_err(|e| {
        spin_fail(&pb, "login failed");
        e.to_string()
    })?;
    spin_ok(&pb, &format!("logged in as {handle}"));

    let publisher = TilePublisher::from_directory(dir).map_err(|e| e.to_string())?;

    let mut stable_map = if stable_id {
        let path = default_stable_ids_path().map_err(|e| e.to_string())?;
        Some(StableIdMap::open(&path).map_err(|e| e.to_string())?)
    } else {
        None
    };
    let rkey = stable_map
        .as_ref()
        .and_then(|map| map.get(dir).cloned());

    let progress = publisher.publish(Arc::new(client), PublishOptions { rkey });
    let pb = spinner("publishing…");
    for event in progress.events() {
        match event {
            PublishEvent::Warning { message } => {
                pb.println(format!("{} {message}", Style::new().yellow().apply_to("warning:")));
            }
            PublishEvent::UploadStarted { path } => pb.set_message(format!("uploading {path}")),
            PublishEvent::UploadCompleted { path } => pb.println(format!("✓ {path}")),
            PublishEvent::UploadFailed { path, reason } => {
                pb.println(format!("✗ {path}: {reason}"));
            }
            PublishEvent::Published { .. } => {}
        }
    }
    let published = match progress.finish() {
        Ok(published) => {
            spin_ok(&pb, "published");
            published
        }
        Err(e) => {
            spin_fail(&pb, "publish failed");
            return Err(e.to_string());
        }
    };

    if let Some(map) = stable_map.as_mut() {
        map.record(dir, published.rkey.clone())
            .map_err(|e| e.to_string())?;
    }

    if json {
        let payload = serde_json::json!({
            "uri": published.uri,
            "rkey": published.rkey,
            "cid": published.cid,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("uri: {}", published.uri);
        println!("cid: {}", published.cid);
    }
    Ok(EXIT_SUCCESS)
}
