use super::{json_pretty, load_credentials, EXIT_SUCCESS};

pub fn run(handle: &str, json: bool) -> Result<u8, String> {
    let (path, mut store) = load_credentials()?;
    store.set_default(handle).map_err(|e| e.to_string())?;
    store.save(&path).map_err(|e| e.to_string())?;

    if json {
        println!(
            "{}",
            json_pretty(&serde_json::json!({ "default_user": handle }))?
        );
    } else {
        println!("default user is now '{handle}'");
    }
    Ok(EXIT_SUCCESS)
}
