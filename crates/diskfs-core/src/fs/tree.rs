//! Multi-call directory tree algorithms.
//!
//! Both walks issue remote calls strictly one after another and stop at the
//! first failure, leaving whatever was already created or deleted in place.

use super::DiskFs;
use crate::error::{DiskError, FsResult, Op, PathError};

/// Create `name` and every missing ancestor below the view's base.
///
/// Existing directories are skipped. A file anywhere on the way fails with
/// `NotADirectory` naming that prefix.
pub async fn mkdir_all(fs: &DiskFs, name: &str) -> FsResult<()> {
    let abs = fs.resolve(Op::Mkdir, name)?;
    let prefixes = fs.scope.prefixes_below_base(&abs);
    if prefixes.is_empty() {
        // The target is the base itself, which is never created here.
        let res = fs
            .remote
            .fetch_metadata(&abs, false)
            .await
            .map_err(|e| PathError::new(Op::Mkdir, name, e))?;
        if !res.is_dir() {
            return Err(PathError::new(Op::Mkdir, name, DiskError::not_a_directory(name)));
        }
        return Ok(());
    }
    for prefix in prefixes {
        let shown = fs.scope.unresolve(&prefix);
        match fs.remote.fetch_metadata(&prefix, false).await {
            Ok(res) if res.is_dir() => continue,
            Ok(_) => {
                return Err(PathError::new(
                    Op::Mkdir,
                    shown.clone(),
                    DiskError::not_a_directory(shown),
                ));
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %prefix, "creating missing directory");
                fs.remote
                    .create_directory(&prefix)
                    .await
                    .map_err(|e| PathError::new(Op::Mkdir, shown, e))?;
            }
            Err(e) => return Err(PathError::new(Op::Mkdir, shown, e)),
        }
    }
    Ok(())
}

enum Frame {
    /// Fetch the node and schedule its children, then itself.
    Visit(String),
    /// Every child is gone; delete the node.
    Delete(String),
}

/// Delete `name` and all of its descendants, depth first.
///
/// Children go in listing order and each child's subtree is finished before
/// its next sibling is visited. The node itself is deleted last. A node
/// that is already gone counts as removed.
pub async fn remove_all(fs: &DiskFs, name: &str) -> FsResult<()> {
    let abs = fs.resolve(Op::Remove, name)?;
    let mut stack = vec![Frame::Visit(abs)];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Visit(path) => {
                let res = match fs.remote.fetch_metadata(&path, true).await {
                    Ok(res) => res,
                    Err(e) if e.is_not_found() => {
                        tracing::debug!(path = %path, "already absent");
                        continue;
                    }
                    Err(e) => {
                        return Err(PathError::new(Op::Remove, fs.scope.unresolve(&path), e));
                    }
                };
                stack.push(Frame::Delete(path));
                if res.is_dir() {
                    stack.extend(
                        res.children
                            .into_iter()
                            .rev()
                            .map(|child| Frame::Visit(child.path)),
                    );
                }
            }
            Frame::Delete(path) => {
                fs.remote
                    .delete_node(&path, true)
                    .await
                    .map_err(|e| PathError::new(Op::Remove, fs.scope.unresolve(&path), e))?;
            }
        }
    }
    Ok(())
}
