use super::{json_pretty, EXIT_MANIFEST_ERROR, EXIT_SUCCESS};
use console::Style;
use std::path::Path;
use tilekit_container::TileReader;
use tilekit_schema::{manifest_cid, validate};

pub fn run(file: &Path, json: bool) -> Result<u8, String> {
    let reader = TileReader::open(file).map_err(|e| e.to_string())?;
    let manifest = reader.manifest();
    let cid = manifest_cid(manifest).map_err(|e| e.to_string())?;
    let report = validate(manifest);

    if json {
        let payload = serde_json::json!({
            "cid": cid,
            "manifest": manifest,
            "errors": report.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "warnings": report.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("name:        {}", manifest.name);
        if let Some(ref description) = manifest.description {
            println!("description: {description}");
        }
        println!("cid:         {cid}");
        println!("resources:   {}", manifest.resources.len());
        for (path, entry) in &manifest.resources {
            let content_type = entry
                .headers
                .get("content-type")
                .map(String::as_str)
                .unwrap_or("-");
            let src = entry
                .src
                .map(|c| c.to_string()[..12].to_owned())
                .unwrap_or_else(|| "(no src)".to_owned());
            println!("  {path}  {content_type}  {src}");
        }
        for warning in &report.warnings {
            println!("{} {warning}", Style::new().yellow().apply_to("warning:"));
        }
        for error in &report.errors {
            println!("{} {error}", Style::new().red().apply_to("error:"));
        }
    }

    if report.is_ok() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_MANIFEST_ERROR)
    }
}
