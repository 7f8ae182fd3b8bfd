pub mod batch;
pub mod config;
pub mod process;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use schet_core::SchetConfig;

/// Largest accepted document.
pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// Accepted document extensions.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

/// Where the configuration lives unless `--config` says otherwise.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("schet")
        .join("config.json")
}

pub fn config_file_path(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the configuration file, falling back to defaults when it does not exist.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<SchetConfig> {
    let path = config_file_path(config_path);
    if path.exists() {
        debug!("Loading config from {}", path.display());
        Ok(SchetConfig::from_file(&path)?)
    } else {
        Ok(SchetConfig::default())
    }
}

/// Read an input document after checking its type and size.
pub fn read_document(path: &Path) -> anyhow::Result<Vec<u8>> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        anyhow::bail!("Only PDF files are supported: {}", path.display());
    }

    let size = fs::metadata(path)?.len();
    if size > MAX_FILE_SIZE {
        anyhow::bail!(
            "File is too large: {}. Maximum size: {} MB",
            path.display(),
            MAX_FILE_SIZE / (1024 * 1024)
        );
    }
    if size == 0 {
        anyhow::bail!("File is empty: {}", path.display());
    }

    Ok(fs::read(path)?)
}
