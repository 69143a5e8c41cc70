//! Filesystem view over a remote resource client.
//!
//! [`DiskFs`] is the entry point: it resolves caller paths through its
//! [`Scope`], issues remote calls, and reports results in the caller's
//! coordinates. Every remote call races the view's cancellation token.

mod handle;
pub mod tree;

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{DiskError, DiskResult, FsResult, Op, PathError};
use crate::remote::ResourceClient;
use crate::scope::Scope;
use crate::types::{DiskInfo, FileInfo, Resource, User};

pub use handle::{DirBatch, File, ReadOutcome};

/// A client plus the token that can cancel its calls.
#[derive(Clone)]
pub(crate) struct Remote {
    client: Arc<dyn ResourceClient>,
    cancel: CancellationToken,
}

impl Remote {
    async fn guard<T>(&self, call: impl Future<Output = DiskResult<T>>) -> DiskResult<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DiskError::Cancelled),
            res = call => res,
        }
    }

    pub(crate) async fn fetch_metadata(&self, path: &str, children: bool) -> DiskResult<Resource> {
        self.guard(self.client.fetch_metadata(path, children)).await
    }

    pub(crate) async fn fetch_file_bytes(&self, path: &str) -> DiskResult<Vec<u8>> {
        self.guard(self.client.fetch_file_bytes(path)).await
    }

    pub(crate) async fn upload_file_bytes(
        &self,
        path: &str,
        data: &[u8],
        overwrite: bool,
    ) -> DiskResult<()> {
        self.guard(self.client.upload_file_bytes(path, data, overwrite))
            .await
    }

    pub(crate) async fn create_directory(&self, path: &str) -> DiskResult<()> {
        self.guard(self.client.create_directory(path)).await
    }

    pub(crate) async fn delete_node(&self, path: &str, permanent: bool) -> DiskResult<()> {
        self.guard(self.client.delete_node(path, permanent)).await
    }

    pub(crate) async fn disk_info(&self) -> DiskResult<DiskInfo> {
        self.guard(self.client.disk_info()).await
    }
}

/// Filesystem view of a cloud disk, optionally scoped to a subtree.
///
/// Cheap to clone. Views created with [`DiskFs::sub`] share the client and
/// the cancellation token of their parent.
#[derive(Clone)]
pub struct DiskFs {
    remote: Remote,
    scope: Scope,
}

impl std::fmt::Debug for DiskFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskFs")
            .field("scope", &self.scope)
            .field("cancelled", &self.remote.cancel.is_cancelled())
            .finish()
    }
}

impl DiskFs {
    /// Create a root view over `client`.
    pub fn new(client: impl ResourceClient + 'static) -> Self {
        Self::from_arc(Arc::new(client))
    }

    /// Create a root view over a shared client.
    pub fn from_arc(client: Arc<dyn ResourceClient>) -> Self {
        Self {
            remote: Remote {
                client,
                cancel: CancellationToken::new(),
            },
            scope: Scope::root(),
        }
    }

    /// Create a root view after checking that the client can reach the disk.
    pub async fn connect(client: Arc<dyn ResourceClient>) -> DiskResult<Self> {
        let fs = Self::from_arc(client);
        let info = fs.remote.disk_info().await?;
        tracing::info!(login = %info.user.login, "connected to disk");
        Ok(fs)
    }

    /// Use `token` to cancel this view's remote calls.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.remote.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.remote.cancel
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn client(&self) -> &Arc<dyn ResourceClient> {
        &self.remote.client
    }

    fn resolve(&self, op: Op, name: &str) -> FsResult<String> {
        self.scope
            .resolve(name)
            .map_err(|e| PathError::new(op, name, e))
    }

    fn file_info(&self, res: &Resource) -> FileInfo {
        FileInfo::from_resource(res, self.scope.unresolve(&res.path))
    }

    /// Open a node. No content is fetched until the first read.
    #[tracing::instrument(skip(self), name = "fs.open")]
    pub async fn open(&self, name: &str) -> FsResult<File> {
        let path = self.resolve(Op::Open, name)?;
        let res = self
            .remote
            .fetch_metadata(&path, false)
            .await
            .map_err(|e| PathError::new(Op::Open, name, e))?;
        let info = self.file_info(&res);
        Ok(File::new(
            self.remote.clone(),
            self.scope.clone(),
            name.to_string(),
            path,
            info,
        ))
    }

    /// Fetch a node's metadata.
    #[tracing::instrument(skip(self), name = "fs.stat")]
    pub async fn stat(&self, name: &str) -> FsResult<FileInfo> {
        let path = self.resolve(Op::Stat, name)?;
        let res = self
            .remote
            .fetch_metadata(&path, false)
            .await
            .map_err(|e| PathError::new(Op::Stat, name, e))?;
        Ok(self.file_info(&res))
    }

    /// A view rooted at the directory `dir`.
    #[tracing::instrument(skip(self), name = "fs.sub")]
    pub async fn sub(&self, dir: &str) -> FsResult<DiskFs> {
        let path = self.resolve(Op::Sub, dir)?;
        let res = self
            .remote
            .fetch_metadata(&path, false)
            .await
            .map_err(|e| PathError::new(Op::Sub, dir, e))?;
        if !res.is_dir() {
            return Err(PathError::new(Op::Sub, dir, DiskError::not_a_directory(dir)));
        }
        Ok(DiskFs {
            remote: self.remote.clone(),
            scope: Scope::scoped(&res.path),
        })
    }

    /// Fetch a file's whole content in one call.
    #[tracing::instrument(skip(self), name = "fs.read_file")]
    pub async fn read_file(&self, name: &str) -> FsResult<Vec<u8>> {
        let path = self.resolve(Op::Read, name)?;
        self.remote
            .fetch_file_bytes(&path)
            .await
            .map_err(|e| PathError::new(Op::Read, name, e))
    }

    /// List a directory, sorted by name.
    #[tracing::instrument(skip(self), name = "fs.read_dir")]
    pub async fn read_dir(&self, name: &str) -> FsResult<Vec<FileInfo>> {
        let path = self.resolve(Op::ReadDir, name)?;
        let res = self
            .remote
            .fetch_metadata(&path, true)
            .await
            .map_err(|e| PathError::new(Op::ReadDir, name, e))?;
        if !res.is_dir() {
            return Err(PathError::new(
                Op::ReadDir,
                name,
                DiskError::not_a_directory(name),
            ));
        }
        let mut entries: Vec<FileInfo> = res.children.iter().map(|c| self.file_info(c)).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Create or replace a file.
    #[tracing::instrument(skip(self, data), fields(len = data.len()), name = "fs.write_file")]
    pub async fn write_file(&self, name: &str, data: &[u8]) -> FsResult<()> {
        let path = self.resolve(Op::Write, name)?;
        self.remote
            .upload_file_bytes(&path, data, true)
            .await
            .map_err(|e| PathError::new(Op::Write, name, e))
    }

    /// Create a file, failing if anything already exists at `name`.
    #[tracing::instrument(
        skip(self, data),
        fields(len = data.len()),
        name = "fs.write_file_exclusive"
    )]
    pub async fn write_file_exclusive(&self, name: &str, data: &[u8]) -> FsResult<()> {
        let path = self.resolve(Op::Write, name)?;
        self.remote
            .upload_file_bytes(&path, data, false)
            .await
            .map_err(|e| PathError::new(Op::Write, name, e))
    }

    /// Create or truncate a file and open it.
    #[tracing::instrument(skip(self), name = "fs.create")]
    pub async fn create(&self, name: &str) -> FsResult<File> {
        self.write_file(name, &[]).await?;
        self.open(name).await
    }

    /// Create exactly one directory. The parent must exist.
    #[tracing::instrument(skip(self), name = "fs.mkdir")]
    pub async fn mkdir(&self, name: &str) -> FsResult<()> {
        let path = self.resolve(Op::Mkdir, name)?;
        self.remote
            .create_directory(&path)
            .await
            .map_err(|e| PathError::new(Op::Mkdir, name, e))
    }

    /// Create a directory and every missing ancestor.
    #[tracing::instrument(skip(self), name = "fs.mkdir_all")]
    pub async fn mkdir_all(&self, name: &str) -> FsResult<()> {
        tree::mkdir_all(self, name).await
    }

    /// Permanently delete a file or an empty directory.
    #[tracing::instrument(skip(self), name = "fs.remove")]
    pub async fn remove(&self, name: &str) -> FsResult<()> {
        let path = self.resolve(Op::Remove, name)?;
        let res = self
            .remote
            .fetch_metadata(&path, true)
            .await
            .map_err(|e| PathError::new(Op::Remove, name, e))?;
        if res.is_dir() && !res.children.is_empty() {
            return Err(PathError::new(
                Op::Remove,
                name,
                DiskError::directory_not_empty(name),
            ));
        }
        self.remote
            .delete_node(&path, true)
            .await
            .map_err(|e| PathError::new(Op::Remove, name, e))
    }

    /// Permanently delete a node and everything below it.
    ///
    /// Succeeds if nothing exists at `name`.
    #[tracing::instrument(skip(self), name = "fs.remove_all")]
    pub async fn remove_all(&self, name: &str) -> FsResult<()> {
        tree::remove_all(self, name).await
    }

    /// Disk-wide usage and owner.
    #[tracing::instrument(skip(self), name = "fs.disk_info")]
    pub async fn disk_info(&self) -> DiskResult<DiskInfo> {
        self.remote.disk_info().await
    }

    /// The disk's owner.
    #[tracing::instrument(skip(self), name = "fs.user_info")]
    pub async fn user_info(&self) -> DiskResult<User> {
        Ok(self.disk_info().await?.user)
    }
}
