//! Error types.
//!
//! [`DiskError`] is the taxonomy shared by remote clients and the filesystem
//! layer. [`PathError`] is what the filesystem view hands back to callers:
//! the failing operation, the caller's (scope-relative) path, and the cause.

use std::io;
use thiserror::Error;

/// Error kind produced by remote clients and filesystem algorithms.
#[derive(Debug, Error)]
pub enum DiskError {
    /// Target path absent (or, for creation, a missing ancestor).
    #[error("resource not found: {0}")]
    NotFound(String),

    /// A node already occupies the path.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Directory not empty.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// A `..` segment tried to climb above the view's base.
    #[error("path escapes scope: {0}")]
    PathEscapesScope(String),

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The remote service reported a structured failure.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response decoding failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// The operation was cancelled before the remote call completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl DiskError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    /// Create a PathEscapesScope error.
    pub fn path_escapes_scope(path: impl Into<String>) -> Self {
        Self::PathEscapesScope(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a Network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an Internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true for [`DiskError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for DiskError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Internal(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for DiskError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Convert DiskError to std::io::Error for compatibility.
impl From<DiskError> for io::Error {
    fn from(e: DiskError) -> Self {
        match e {
            DiskError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            DiskError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            DiskError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            DiskError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            DiskError::DirectoryNotEmpty(msg) => {
                io::Error::new(io::ErrorKind::DirectoryNotEmpty, msg)
            }
            DiskError::PathEscapesScope(msg) => {
                io::Error::new(io::ErrorKind::PermissionDenied, msg)
            }
            DiskError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            DiskError::Network(msg) => io::Error::new(io::ErrorKind::ConnectionAborted, msg),
            DiskError::Api { status, message } => {
                io::Error::other(format!("API error ({status}): {message}"))
            }
            DiskError::Internal(msg) => io::Error::new(io::ErrorKind::InvalidData, msg),
            DiskError::Cancelled => {
                io::Error::new(io::ErrorKind::Interrupted, "operation cancelled")
            }
        }
    }
}

/// Result type for remote clients and internal algorithms.
pub type DiskResult<T> = Result<T, DiskError>;

/// Filesystem operation names used to tag [`PathError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Op {
    Open,
    Stat,
    Read,
    #[strum(serialize = "readdirent")]
    ReadDir,
    Write,
    Mkdir,
    Remove,
    Sub,
}

/// An error tagged with the operation and the caller-supplied path.
#[derive(Debug, Error)]
#[error("{op} {path}: {source}")]
pub struct PathError {
    pub op: Op,
    pub path: String,
    #[source]
    pub source: DiskError,
}

impl PathError {
    pub fn new(op: Op, path: impl Into<String>, source: DiskError) -> Self {
        Self {
            op,
            path: path.into(),
            source,
        }
    }

    /// The underlying error kind.
    pub fn kind(&self) -> &DiskError {
        &self.source
    }

    pub fn is_not_found(&self) -> bool {
        self.source.is_not_found()
    }
}

impl From<PathError> for io::Error {
    fn from(e: PathError) -> Self {
        let op = e.op;
        let path = e.path;
        let inner: io::Error = e.source.into();
        io::Error::new(inner.kind(), format!("{op} {path}: {inner}"))
    }
}

/// Result type for filesystem view operations.
pub type FsResult<T> = Result<T, PathError>;
