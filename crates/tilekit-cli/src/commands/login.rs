use super::{client_for, json_pretty, load_credentials, spin_fail, spin_ok, spinner, EXIT_SUCCESS};

pub fn run(
    handle: &str,
    app_password: &str,
    service: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let mut client = client_for(service);

    let pb = spinner("verifying credentials…");
    let session = client.login(handle, app_password).map_err(|e| {
        spin_fail(&pb, "login failed");
        e.to_string()
    })?;
    spin_ok(&pb, &format!("logged in as {}", session.handle));

    let (path, mut store) = load_credentials()?;
    store.add(handle, app_password);
    store.save(&path).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "handle": session.handle,
            "did": session.did,
            "default_user": store.default_user,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("stored credentials for {} ({})", session.handle, session.did);
        if store.default_user.as_deref() == Some(handle) {
            println!("'{handle}' is now the default user");
        }
    }
    Ok(EXIT_SUCCESS)
}
