use super::{json_pretty, EXIT_SUCCESS};
use std::path::Path;
use tilekit_container::TileWriter;
use tilekit_remote::TilePublisher;
use tilekit_schema::validate;

pub fn run(dir: &Path, out: &Path, json: bool) -> Result<u8, String> {
    let publisher = TilePublisher::from_directory(dir).map_err(|e| e.to_string())?;

    let report = validate(publisher.manifest());
    if !report.is_ok() {
        let reasons: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        return Err(format!("manifest error: {}", reasons.join("; ")));
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    let (manifest, sources) = publisher.into_parts();
    let mut writer = TileWriter::new(manifest.clone()).map_err(|e| e.to_string())?;
    for (path, file) in &sources {
        let headers = manifest
            .resource(path)
            .map(|entry| entry.headers.clone())
            .unwrap_or_default();
        writer
            .add_resource(path, headers, file)
            .map_err(|e| e.to_string())?;
    }
    let cid = writer.write(out).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "out": out.display().to_string(),
            "cid": cid,
            "resources": sources.len(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("packed {} ({} resources)", out.display(), sources.len());
        println!("cid: {cid}");
    }
    Ok(EXIT_SUCCESS)
}
