//! Configuration and log locations
//!
//! Linux: `~/.config/apiflow/`, macOS: `~/Library/Application Support/apiflow/`,
//! Windows: `%APPDATA%\apiflow\`

use std::path::{Path, PathBuf};

/// Application name used for platform directories
const APP_NAME: &str = "apiflow";

/// Name of the configuration file
pub const CONFIG_FILE: &str = "apiflow.toml";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the user-level configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}

/// Locate the configuration file to use
///
/// Search order: explicit path, `./apiflow.toml`, user config directory.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    config_path().filter(|p| p.exists())
}

/// Resolve `path` against `root` unless it is already absolute
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_is_valid() {
        let dir = config_dir();
        assert!(dir.is_some());
    }

    #[test]
    fn test_explicit_config_wins() {
        let explicit = PathBuf::from("/tmp/custom.toml");
        assert_eq!(find_config(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let root = Path::new("/srv/project");
        assert_eq!(
            resolve(root, Path::new("cases/a.yaml")),
            PathBuf::from("/srv/project/cases/a.yaml")
        );
        assert_eq!(resolve(root, Path::new("/etc/x")), PathBuf::from("/etc/x"));
    }
}
