//! Path scoping for subtree views.
//!
//! A [`Scope`] maps caller paths onto absolute remote paths and back. The
//! root view is unscoped and passes paths through untouched; a view created
//! by descending into a directory joins every caller path onto that
//! directory and trims it back off the paths it reports.
//!
//! Both directions are pure functions of `(base, scoped)`.

use crate::error::{DiskError, DiskResult};

/// Base path plus a flag saying whether rewriting is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    base: String,
    scoped: bool,
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl Scope {
    /// The unscoped root view.
    pub fn root() -> Self {
        Self {
            base: "/".to_string(),
            scoped: false,
        }
    }

    /// A view rooted at `base`. The base is normalized.
    pub fn scoped(base: &str) -> Self {
        Self {
            base: normalize(base),
            scoped: true,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_scoped(&self) -> bool {
        self.scoped
    }

    /// Map a caller path to the absolute remote path.
    ///
    /// Unscoped views return the path unchanged. Scoped views join it onto
    /// the base; `..` may climb back up to the base but never past it.
    /// Paths containing NUL are rejected in both.
    pub fn resolve(&self, rel: &str) -> DiskResult<String> {
        if rel.contains('\0') {
            return Err(DiskError::invalid_path(rel.replace('\0', "\\0")));
        }
        if !self.scoped {
            return Ok(rel.to_string());
        }
        let components =
            clean_components(rel).ok_or_else(|| DiskError::path_escapes_scope(rel))?;
        Ok(join(&self.base, &components))
    }

    /// Map an absolute remote path back to the caller's view.
    ///
    /// The base itself comes back as `"/"`.
    pub fn unresolve(&self, abs: &str) -> String {
        if !self.scoped {
            return abs.to_string();
        }
        if abs == self.base {
            return "/".to_string();
        }
        if self.base == "/" {
            return normalize(abs);
        }
        match abs.strip_prefix(self.base.as_str()) {
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => abs.to_string(),
        }
    }

    /// Every prefix of `abs` strictly below the base, shortest first.
    ///
    /// `/x` scoped, `/x/a/b` yields `["/x/a", "/x/a/b"]`. Paths that do not
    /// sit under the base yield nothing.
    pub fn prefixes_below_base(&self, abs: &str) -> Vec<String> {
        let base: Vec<&str> = segments(&self.base).collect();
        let full = normalize(abs);
        let full: Vec<&str> = segments(&full).collect();
        if full.len() <= base.len() || full[..base.len()] != base[..] {
            return Vec::new();
        }
        (base.len() + 1..=full.len())
            .map(|end| join("/", &full[..end]))
            .collect()
    }
}

/// Lexically clean a path into absolute form (`/a/b`).
///
/// Collapses repeated separators, drops `.`, applies `..` (clamped at the
/// root).
pub fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in segments(path) {
        match segment {
            "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    join("/", &out)
}

/// Non-empty path segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Cleaned components, or `None` if `..` would climb above the start.
fn clean_components(path: &str) -> Option<Vec<&str>> {
    let mut out: Vec<&str> = Vec::new();
    for segment in segments(path) {
        match segment {
            "." => {}
            ".." => {
                out.pop()?;
            }
            s => out.push(s),
        }
    }
    Some(out)
}

fn join(base: &str, components: &[&str]) -> String {
    if components.is_empty() {
        return base.to_string();
    }
    let tail = components.join("/");
    if base == "/" {
        format!("/{tail}")
    } else {
        format!("{}/{tail}", base.trim_end_matches('/'))
    }
}
