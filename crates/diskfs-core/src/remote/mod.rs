//! Remote resource clients.
//!
//! [`ResourceClient`] is the whole contract the filesystem layer needs from
//! the remote: one node per call, nothing transactional. Implementations:
//!
//! - [`HttpClient`] - the cloud disk REST API over `reqwest`
//! - [`MemoryClient`] - in-process tree (testing, offline use)

pub mod api;
mod http;
mod memory;

use async_trait::async_trait;

use crate::error::DiskResult;
use crate::types::{DiskInfo, Resource};

pub use http::HttpClient;
pub use memory::{Call, MemoryClient};

/// Remote resource operations.
///
/// Paths are absolute and root-normalized (`/a/b`). Every returned
/// [`Resource`] has already been normalized.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch one node's metadata, optionally with all of its children.
    ///
    /// Paging through large listings is the client's concern; the returned
    /// children cover everything known at call time.
    async fn fetch_metadata(&self, path: &str, include_children: bool) -> DiskResult<Resource>;

    /// Fetch a file's complete byte content.
    async fn fetch_file_bytes(&self, path: &str) -> DiskResult<Vec<u8>>;

    /// Upload a file's complete byte content.
    ///
    /// With `overwrite == false` an existing node is a conflict.
    async fn upload_file_bytes(&self, path: &str, data: &[u8], overwrite: bool) -> DiskResult<()>;

    /// Create exactly one directory. The parent must exist.
    async fn create_directory(&self, path: &str) -> DiskResult<()>;

    /// Delete a node (and, remotely, everything under it).
    ///
    /// `permanent == false` moves it to the trash instead.
    async fn delete_node(&self, path: &str, permanent: bool) -> DiskResult<()>;

    /// Disk-wide metadata. Also serves as a credentials check.
    async fn disk_info(&self) -> DiskResult<DiskInfo>;
}
