use super::{json_pretty, EXIT_SUCCESS};
use std::io::Write;
use std::path::Path;
use tilekit_container::{PathResolution, TileReader};

pub fn run(file: &Path, path: &str, json: bool) -> Result<u8, String> {
    let reader = TileReader::open(file).map_err(|e| e.to_string())?;
    match reader.resolve_path(path).map_err(|e| e.to_string())? {
        PathResolution::NotFound => Err(format!("no resource at '{path}'")),
        PathResolution::Found(block) => {
            if json {
                let payload = serde_json::json!({
                    "path": path,
                    "cid": block.cid,
                    "length": block.range.len(),
                    "headers": block.headers,
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                let mut body = block.reader().map_err(|e| e.to_string())?;
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                std::io::copy(&mut body, &mut out).map_err(|e| e.to_string())?;
                out.flush().map_err(|e| e.to_string())?;
            }
            Ok(EXIT_SUCCESS)
        }
    }
}
