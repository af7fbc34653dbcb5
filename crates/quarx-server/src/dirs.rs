use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Resolve the data directory: explicit override first, then the platform
/// default (e.g. `~/.local/share/quarx` on Linux). Creates it if missing.
pub fn resolve_data_dir(override_dir: Option<&PathBuf>) -> Result<PathBuf> {
    match override_dir {
        Some(d) => {
            std::fs::create_dir_all(d).context("create data dir")?;
            Ok(d.clone())
        }
        None => data_dir(),
    }
}

pub fn data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "quarx")
        .context("cannot determine platform data directory")?;
    let dir = dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&dir).context("create data dir")?;
    Ok(dir)
}
