//! Platform configuration paths and small filesystem helpers

use std::io;
use std::path::{Path, PathBuf};

/// Name used for the settings directory
const APP_NAME: &str = "qa-runner";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/qa-runner/`
/// - macOS: `~/Library/Application Support/qa-runner/`
/// - Windows: `%APPDATA%\qa-runner\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the settings file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Directory that holds `path`, treating a bare file name as the current
/// directory
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Ensure the directory that will hold `path` exists
pub fn ensure_parent_dir(path: &Path) -> io::Result<PathBuf> {
    let dir = parent_dir(path);
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert!(path.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_parent_dir_of_bare_name() {
        assert_eq!(parent_dir(Path::new("last_good.json")), Path::new("."));
        assert_eq!(
            parent_dir(Path::new("state/last_good.json")),
            Path::new("state")
        );
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a").join("b").join("state.json");
        let dir = ensure_parent_dir(&target).unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir, tmp.path().join("a").join("b"));
    }
}
