use super::{json_pretty, load_credentials, EXIT_SUCCESS};
use console::Style;

pub fn run(json: bool) -> Result<u8, String> {
    let (_, store) = load_credentials()?;
    let handles: Vec<&str> = store.handles().collect();

    if json {
        let payload = serde_json::json!({
            "default_user": store.default_user,
            "users": handles,
        });
        println!("{}", json_pretty(&payload)?);
    } else if handles.is_empty() {
        println!("no stored accounts; run `tilekit login` first");
    } else {
        for handle in handles {
            if store.default_user.as_deref() == Some(handle) {
                println!("* {}", Style::new().bold().apply_to(handle));
            } else {
                println!("  {handle}");
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
