use super::{json_pretty, load_credentials, EXIT_SUCCESS};

pub fn run(handle: &str, json: bool) -> Result<u8, String> {
    let (path, mut store) = load_credentials()?;
    if !store.remove(handle) {
        return Err(format!("no credentials stored for '{handle}'"));
    }
    store.save(&path).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "removed": handle,
            "default_user": store.default_user,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("removed credentials for {handle}");
        if let Some(ref fallback) = store.default_user {
            println!("default user is now '{fallback}'");
        }
    }
    Ok(EXIT_SUCCESS)
}
