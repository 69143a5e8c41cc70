//! Client configuration.
//!
//! Loaded from a RON file (by default `<config dir>/diskfs/config.ron`):
//!
//! ```ron
//! (
//!     api_base: "https://cloud-api.yandex.net/v1/disk",
//!     token: Some("y0_AgAAAA..."),
//!     timeout_secs: 30,
//!     page_size: 100,
//! )
//! ```
//!
//! Every field is optional. `DISKFS_TOKEN` overrides the token.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_API_BASE, DEFAULT_PAGE_SIZE,
    DEFAULT_ROOT_PREFIX, DEFAULT_TIMEOUT_SECS, TOKEN_ENV_VAR,
};

/// Error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    /// REST API base URL, without trailing slash.
    pub api_base: String,
    /// OAuth token.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Children fetched per listing page.
    pub page_size: u32,
    /// Prefix the remote puts in front of absolute paths.
    pub root_prefix: String,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            root_prefix: DEFAULT_ROOT_PREFIX.to_string(),
        }
    }
}

impl DiskConfig {
    /// Default config file location, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Parse a RON document.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    /// Load from `path`, or from the default location if it exists, or
    /// fall back to defaults. Applies the token environment override.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.is_empty() {
                config.token = Some(token);
            }
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builder-style token override.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Builder-style API base override.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiskConfig::default();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_partial_ron() {
        let config = DiskConfig::from_ron(r#"(token: Some("abc"), page_size: 10)"#).unwrap();
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.root_prefix, "disk:");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ron");
        std::fs::write(&path, r#"(api_base: "http://127.0.0.1:9000/v1/disk", timeout_secs: 5)"#)
            .unwrap();

        let config = DiskConfig::from_file(&path).unwrap();
        assert_eq!(config.api_base, "http://127.0.0.1:9000/v1/disk");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_missing_file() {
        let err = DiskConfig::from_file(Path::new("/nonexistent/diskfs.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_bad_ron() {
        assert!(matches!(
            DiskConfig::from_ron("(page_size: \"lots\")"),
            Err(ConfigError::Ron(_))
        ));
    }
}
