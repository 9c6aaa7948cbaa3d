//! Filesystem locations for run logs and exports.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::SetupError;

/// Get the path to the log directory.
///
/// `logging.log_dir` wins when set; otherwise the platform data directory.
pub fn log_directory(config: &Config) -> PathBuf {
    if !config.logging.log_dir.is_empty() {
        return PathBuf::from(&config.logging.log_dir);
    }

    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(&config.app.name)
        .join("logs")
}

/// Create `dir` if needed and return it.
pub fn ensure_output_dir(dir: &Path) -> Result<&Path, SetupError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|source| SetupError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(dir)
}
