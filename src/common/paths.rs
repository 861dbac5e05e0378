//! Configuration, data and working-directory paths
//!
//! Platform directories come from the `directories` crate:
//! - Linux: `~/.config/netsnap/` and `~/.local/share/netsnap/`
//! - macOS: `~/Library/Application Support/netsnap/`
//! - Windows: `%APPDATA%\netsnap\`

use std::io;
use std::path::{Path, PathBuf};

/// Application name used for platform directories
const APP_NAME: &str = "netsnap";

/// Directory (relative to the working directory) holding snapshot files
pub const SNAPSHOT_DIR: &str = "snapshots";

/// Directory (relative to the working directory) holding main config and test files
pub const CONFIGS_DIR: &str = "configs";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the settings file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("logs"))
}

/// Resolve a test definition file named in the main config
///
/// Names that are not an existing file are looked up under `configs/`
/// relative to `base`.
pub fn resolve_test_file(base: &Path, name: &str) -> PathBuf {
    let direct = PathBuf::from(name);
    if direct.is_file() {
        return direct;
    }
    base.join(CONFIGS_DIR).join(name)
}

/// Ensure a directory exists, creating parents as needed
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
        }
    }

    #[test]
    fn test_resolve_test_file_falls_back_to_configs() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_test_file(dir.path(), "test_does_not_exist.yml");
        assert_eq!(
            resolved,
            dir.path().join("configs").join("test_does_not_exist.yml")
        );
    }

    #[test]
    fn test_resolve_test_file_keeps_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tests.yml");
        std::fs::write(&file, "{}").unwrap();
        let name = file.to_string_lossy().into_owned();
        assert_eq!(resolve_test_file(Path::new("/nonexistent"), &name), file);
    }
}
