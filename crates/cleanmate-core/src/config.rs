//! Cleanup configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::CleanError;

/// File name of the configuration inside the config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Directory name used under the platform config and data dirs.
pub const APP_DIR: &str = "cleanmate";

/// Configuration for analyze and clean operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct CleanConfig {
    /// Whitelist targets to process (empty = every registered target).
    #[builder(default)]
    pub targets: Vec<String>,

    /// Number of largest files kept in an analysis.
    #[builder(default = "10")]
    pub top_n: usize,

    /// Report symbolic links whose resolved target stays inside the roots.
    #[builder(default = "false")]
    pub follow_symlinks: bool,

    /// Emit a scan progress event every this many entries.
    #[builder(default = "250")]
    pub progress_interval: u64,

    /// Maximum chat history entries kept on disk.
    #[builder(default = "50")]
    pub history_limit: usize,

    /// Maximum cleanup reports kept on disk.
    #[builder(default = "10")]
    pub report_limit: usize,

    /// Directory for history and report files (None = platform data dir).
    #[builder(default)]
    pub data_dir: Option<PathBuf>,
}

impl CleanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(0) = self.top_n {
            return Err("top_n must be at least 1".to_string());
        }
        if let Some(0) = self.progress_interval {
            return Err("progress_interval must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            top_n: 10,
            follow_symlinks: false,
            progress_interval: 250,
            history_limit: 50,
            report_limit: 10,
            data_dir: None,
        }
    }
}

impl CleanConfig {
    /// Create a new config builder.
    pub fn builder() -> CleanConfigBuilder {
        CleanConfigBuilder::default()
    }

    /// Default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, CleanError> {
        let config: Self = toml::from_str(text).map_err(|e| CleanError::Config {
            message: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Load the configuration at `path`, or defaults if it does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CleanError> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Ok(Self::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let config = Self::from_toml(&text)?;
                tracing::debug!(path = %path.display(), "loaded configuration");
                Ok(config)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(CleanError::io(path, err)),
        }
    }

    /// Directory holding history and report files.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
        })
    }

    fn check(&self) -> Result<(), CleanError> {
        if self.top_n == 0 {
            return Err(CleanError::InvalidConfig {
                message: "top_n must be at least 1".to_string(),
            });
        }
        if self.progress_interval == 0 {
            return Err(CleanError::InvalidConfig {
                message: "progress_interval must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = CleanConfig::builder()
            .targets(vec!["temp".to_string()])
            .top_n(5usize)
            .follow_symlinks(true)
            .build()
            .unwrap();

        assert_eq!(config.targets, vec!["temp".to_string()]);
        assert_eq!(config.top_n, 5);
        assert!(config.follow_symlinks);
        assert_eq!(config.report_limit, 10);
    }

    #[test]
    fn test_builder_rejects_zero_top_n() {
        assert!(CleanConfig::builder().top_n(0usize).build().is_err());
    }

    #[test]
    fn test_from_toml_fills_defaults() {
        let config = CleanConfig::from_toml("top_n = 3\ntargets = [\"temp\"]\n").unwrap();
        assert_eq!(config.top_n, 3);
        assert_eq!(config.history_limit, 50);
        assert!(!config.follow_symlinks);
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(matches!(
            CleanConfig::from_toml("top_n = \"many\""),
            Err(CleanError::Config { .. })
        ));
        assert!(matches!(
            CleanConfig::from_toml("top_n = 0"),
            Err(CleanError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = CleanConfig::load_or_default(Some(&temp.path().join("none.toml"))).unwrap();
        assert_eq!(config.top_n, 10);
    }
}
