//! Client configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

/// Base URL of the cloud disk REST API.
pub const DEFAULT_API_BASE: &str = "https://cloud-api.yandex.net/v1/disk";

/// Token the remote prefixes onto every absolute path.
pub const DEFAULT_ROOT_PREFIX: &str = "disk:";

/// Request timeout for a single remote call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Embedded children requested per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Fields requested when only node metadata is needed.
pub const MINIMAL_FIELDS: &[&str] = &["name", "path", "type", "size", "modified"];

/// Environment variable that overrides the configured OAuth token.
pub const TOKEN_ENV_VAR: &str = "DISKFS_TOKEN";

/// Config file name under the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Application directory under the platform config directory.
pub const CONFIG_DIR_NAME: &str = "diskfs";
