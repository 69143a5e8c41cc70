//! Core data types.
//!
//! [`Resource`] is what a remote client returns for one node. [`FileInfo`] is
//! the caller-facing metadata shape, shared by `stat` results and directory
//! entries and exposed through the [`Metadata`] and [`DirEntryView`] traits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;

/// Node kind as reported by the remote.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ResourceKind {
    /// Leaf node with byte content.
    #[serde(rename = "file")]
    #[strum(to_string = "file")]
    File,
    /// Node containing children.
    #[serde(rename = "dir")]
    #[strum(to_string = "dir", serialize = "directory")]
    Directory,
}

impl ResourceKind {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, ResourceKind::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, ResourceKind::Directory)
    }
}

/// Snapshot of one remote node.
///
/// A fresh value is produced by every fetch; two fetches of the same path
/// may disagree if the remote changed in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Absolute, root-normalized path (`/a/b`).
    pub path: String,
    /// Last path segment; `"/"` for the storage root.
    pub name: String,
    pub kind: ResourceKind,
    /// Size in bytes. Only meaningful for files.
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Embedded children, in remote listing order. Empty unless requested.
    pub children: Vec<Resource>,
}

impl Resource {
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }
}

/// Strip the remote root token from `path` and name the root node `"/"`.
///
/// Applied by every client before a [`Resource`] reaches the filesystem layer.
/// Embedded children are normalized too.
pub fn normalize_resource(mut res: Resource, root_prefix: &str) -> Resource {
    if let Some(stripped) = res.path.strip_prefix(root_prefix) {
        res.path = stripped.to_string();
    }
    if res.path.is_empty() {
        res.path = "/".to_string();
    }
    if res.path == "/" {
        res.name = "/".to_string();
    }
    res.children = res
        .children
        .into_iter()
        .map(|child| normalize_resource(child, root_prefix))
        .collect();
    res
}

/// Owner of the disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub login: String,
    #[serde(default, rename = "display_name")]
    pub name: String,
    #[serde(default)]
    pub uid: String,
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Username:\t{}", self.login)
    }
}

/// Disk-wide metadata. Sizes are in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    #[serde(default)]
    pub trash_size: u64,
    #[serde(default)]
    pub total_space: u64,
    #[serde(default)]
    pub used_space: u64,
    #[serde(default)]
    pub system_folders: HashMap<String, String>,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub revision: i64,
}

impl std::fmt::Display for DiskInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.user)?;
        writeln!(f, "Total space:\t{}", self.total_space)?;
        writeln!(f, "Used space:\t{}", self.used_space)?;
        write!(f, "Trash size:\t{}", self.trash_size)
    }
}

/// Describe-this-node view.
pub trait Metadata {
    fn name(&self) -> &str;
    fn size(&self) -> u64;
    fn is_dir(&self) -> bool;
    fn modified(&self) -> DateTime<Utc>;

    /// Backend-specific extra data. Remote nodes carry none.
    fn sys(&self) -> Option<&(dyn Any + Send + Sync)> {
        None
    }
}

/// List-this-directory view.
pub trait DirEntryView {
    fn name(&self) -> &str;
    fn is_dir(&self) -> bool;
    fn kind(&self) -> ResourceKind;
    fn info(&self) -> &dyn Metadata;
}

/// Caller-facing metadata for one node.
///
/// `path` has already been run through the view's scope, so it can be passed
/// straight back into the same view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub kind: ResourceKind,
    pub modified: DateTime<Utc>,
}

/// Directory entries share the metadata shape.
pub type DirEntry = FileInfo;

impl FileInfo {
    /// Build from a fetched resource, reporting it under `display_path`.
    pub fn from_resource(res: &Resource, display_path: String) -> Self {
        let name = if display_path == "/" {
            "/".to_string()
        } else {
            res.name.clone()
        };
        Self {
            name,
            path: display_path,
            size: if res.is_file() { res.size } else { 0 },
            kind: res.kind,
            modified: res.modified,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }
}

impl Metadata for FileInfo {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }
}

impl DirEntryView for FileInfo {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn info(&self) -> &dyn Metadata {
        self
    }
}
