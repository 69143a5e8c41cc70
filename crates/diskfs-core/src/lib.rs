//! # diskfs-core
//!
//! Filesystem semantics over a cloud disk.
//!
//! The remote store only offers coarse, one-node-at-a-time primitives: fetch
//! a node (optionally with its children), download or upload a whole file,
//! create one directory, delete one subtree. This crate layers a
//! filesystem-shaped contract on top:
//!
//! - [`DiskFs`] - open, stat, read, list, write, mkdir (single and
//!   recursive), remove (single and recursive), scoped subtree views
//! - [`File`] - handle with a whole-body read cursor and a paginated
//!   directory cursor
//! - [`ResourceClient`] - the remote contract, implemented by
//!   [`HttpClient`] (REST API) and [`MemoryClient`] (in-process)
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use diskfs_core::{DiskConfig, DiskFs, HttpClient};
//! use std::sync::Arc;
//!
//! let config = DiskConfig::load(None)?;
//! let fs = DiskFs::connect(Arc::new(HttpClient::from_config(&config)?)).await?;
//! fs.mkdir_all("/backups/2024").await?;
//! fs.write_file("/backups/2024/notes.txt", b"hello").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod fs;
pub mod remote;
pub mod scope;
pub mod types;

pub use config::{ConfigError, DiskConfig};
pub use error::{DiskError, DiskResult, FsResult, Op, PathError};
pub use fs::{DirBatch, DiskFs, File, ReadOutcome};
pub use remote::{Call, HttpClient, MemoryClient, ResourceClient};
pub use scope::Scope;
pub use types::{
    DirEntry, DirEntryView, DiskInfo, FileInfo, Metadata, Resource, ResourceKind, User,
    normalize_resource,
};
