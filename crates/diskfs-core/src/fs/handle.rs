//! Open file handles.

use super::Remote;
use crate::error::{DiskError, FsResult, Op, PathError};
use crate::scope::Scope;
use crate::types::FileInfo;

/// Result of one [`File::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes copied into the caller's buffer.
    pub len: usize,
    /// True once the cursor has reached the end, including on the call that
    /// delivered the final bytes.
    pub eof: bool,
}

/// Result of one [`File::read_dir`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct DirBatch {
    pub entries: Vec<FileInfo>,
    pub eof: bool,
}

/// A handle to one opened node.
///
/// File handles fetch the whole body on the first read and serve later
/// reads from that buffer. Directory handles fetch the child listing on the
/// first `read_dir` of a pass. Neither is shared: every cursor method takes
/// `&mut self`.
pub struct File {
    remote: Remote,
    scope: Scope,
    /// Caller-supplied name, used to tag errors.
    name: String,
    remote_path: String,
    info: FileInfo,
    body: Option<Vec<u8>>,
    read_offset: usize,
    listing: Option<Vec<FileInfo>>,
    dir_offset: usize,
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("remote_path", &self.remote_path)
            .field("kind", &self.info.kind)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .field("read_offset", &self.read_offset)
            .field("dir_offset", &self.dir_offset)
            .finish()
    }
}

impl File {
    pub(crate) fn new(
        remote: Remote,
        scope: Scope,
        name: String,
        remote_path: String,
        info: FileInfo,
    ) -> Self {
        Self {
            remote,
            scope,
            name,
            remote_path,
            info,
            body: None,
            read_offset: 0,
            listing: None,
            dir_offset: 0,
        }
    }

    /// Metadata captured when the handle was opened (or last re-stat'd).
    pub fn info(&self) -> &FileInfo {
        &self.info
    }

    /// The name this handle was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.info.is_dir()
    }

    fn err(&self, op: Op, source: DiskError) -> PathError {
        PathError::new(op, self.name.clone(), source)
    }

    /// Copy the next bytes of the file into `buf`.
    ///
    /// The first call downloads the whole body.
    pub async fn read(&mut self, buf: &mut [u8]) -> FsResult<ReadOutcome> {
        if self.info.is_dir() {
            return Err(self.err(Op::Read, DiskError::is_a_directory(self.name.clone())));
        }
        if self.body.is_none() {
            let data = self
                .remote
                .fetch_file_bytes(&self.remote_path)
                .await
                .map_err(|e| self.err(Op::Read, e))?;
            tracing::trace!(path = %self.remote_path, len = data.len(), "body cached");
            self.body = Some(data);
        }

        let body: &[u8] = self.body.as_deref().unwrap_or(&[]);
        let remaining = &body[self.read_offset..];
        let len = remaining.len().min(buf.len());
        buf[..len].copy_from_slice(&remaining[..len]);
        self.read_offset += len;
        Ok(ReadOutcome {
            len,
            eof: self.read_offset == body.len(),
        })
    }

    /// Drain the rest of the file.
    pub async fn read_to_end(&mut self) -> FsResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let ReadOutcome { len, eof } = self.read(&mut buf).await?;
            out.extend_from_slice(&buf[..len]);
            if eof {
                return Ok(out);
            }
        }
    }

    /// Read directory entries.
    ///
    /// `n <= 0` returns every remaining entry and rewinds the cursor, with
    /// `eof == false`. `n > 0` returns up to `n` entries; `eof` is set when
    /// fewer than `n` were left.
    pub async fn read_dir(&mut self, n: isize) -> FsResult<DirBatch> {
        if !self.info.is_dir() {
            return Err(self.err(Op::ReadDir, DiskError::not_a_directory(self.name.clone())));
        }
        if self.listing.is_none() {
            let res = self
                .remote
                .fetch_metadata(&self.remote_path, true)
                .await
                .map_err(|e| self.err(Op::ReadDir, e))?;
            let entries = res
                .children
                .iter()
                .map(|child| FileInfo::from_resource(child, self.scope.unresolve(&child.path)))
                .collect();
            self.listing = Some(entries);
            self.dir_offset = 0;
        }

        let listing: &[FileInfo] = self.listing.as_deref().unwrap_or(&[]);
        let remaining = &listing[self.dir_offset..];

        if n <= 0 {
            let entries = remaining.to_vec();
            self.dir_offset = 0;
            self.listing = None;
            return Ok(DirBatch {
                entries,
                eof: false,
            });
        }

        let want = n as usize;
        let take = want.min(remaining.len());
        let entries = remaining[..take].to_vec();
        self.dir_offset += take;
        Ok(DirBatch {
            entries,
            eof: take < want,
        })
    }

    /// Re-fetch this node's metadata.
    pub async fn stat(&mut self) -> FsResult<FileInfo> {
        let res = self
            .remote
            .fetch_metadata(&self.remote_path, false)
            .await
            .map_err(|e| self.err(Op::Stat, e))?;
        self.info = FileInfo::from_resource(&res, self.scope.unresolve(&res.path));
        Ok(self.info.clone())
    }

    /// Release the cached body and listing and rewind both cursors.
    ///
    /// Later reads see an empty body without fetching.
    pub fn close(&mut self) {
        self.body = Some(Vec::new());
        self.read_offset = 0;
        self.listing = None;
        self.dir_offset = 0;
    }
}
