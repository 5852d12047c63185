//! Stable per-install device id sent with login

use std::path::Path;

const DEVICE_ID_FILE: &str = "device_id";

/// Read the device id stored in `dir`, generating and persisting a new
/// UUID v4 on first use.
pub fn load_or_create(dir: &Path) -> std::io::Result<String> {
    let path = dir.join(DEVICE_ID_FILE);
    match std::fs::read_to_string(&path) {
        Ok(existing) if !existing.trim().is_empty() => return Ok(existing.trim().to_owned()),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let id = uuid::Uuid::new_v4().to_string();
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, &id)?;
    tracing::debug!(path = %path.display(), "generated device id");
    Ok(id)
}
