/// Platform-specific locations and repository path matching
///
/// Config lookup follows the XDG Base Directory specification on Unix-like
/// systems.
use std::path::PathBuf;

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join("Library/Application Support"))
                .unwrap_or_else(|_| PathBuf::from("."))
        } else {
            std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
                .unwrap_or_else(|_| PathBuf::from("."))
        }
    }

    /// Returns: {config_dir}/doc-history
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join("doc-history")
    }

    /// Returns: {config_dir}/doc-history/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}

/// Whether a repository-relative path lies inside one of the reserved
/// directories, either at the top level (`Archive/...`) or nested
/// (`.../Archive/...`).
///
/// Paths are `/`-separated. A directory path must carry a trailing `/` to
/// match itself.
pub fn is_excluded_path(path: &str, excluded_dirs: &[String]) -> bool {
    excluded_dirs.iter().any(|dir| {
        let prefix = format!("{}/", dir);
        path.starts_with(&prefix) || path.contains(&format!("/{}", prefix))
    })
}

/// Join a tree prefix and an entry name into a `/`-separated repository path
pub fn join_repo_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}
