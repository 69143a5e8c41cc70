//! In-memory resource client.
//!
//! Behaves like the remote at the level the filesystem layer can observe:
//! one node per call, directory creation needs an existing parent, deletes
//! take whole subtrees. Every call is recorded and any call can be made to
//! fail, so tests can assert ordering and first-error behavior.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::error::{DiskError, DiskResult};
use crate::remote::ResourceClient;
use crate::scope::{normalize, segments};
use crate::types::{DiskInfo, Resource, ResourceKind, User};

/// Default capacity reported by [`MemoryClient::disk_info`].
const MEMORY_TOTAL_SPACE: u64 = 10 * 1024 * 1024 * 1024;

/// One recorded client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchMetadata { path: String, children: bool },
    FetchFileBytes(String),
    Upload { path: String, overwrite: bool },
    CreateDirectory(String),
    Delete { path: String, permanent: bool },
    DiskInfo,
}

#[derive(Debug, Clone)]
struct Node {
    kind: ResourceKind,
    data: Vec<u8>,
    modified: DateTime<Utc>,
}

impl Node {
    fn file(data: Vec<u8>) -> Self {
        Self {
            kind: ResourceKind::File,
            data,
            modified: Utc::now(),
        }
    }

    fn directory() -> Self {
        Self {
            kind: ResourceKind::Directory,
            data: Vec::new(),
            modified: Utc::now(),
        }
    }
}

type Failure = Box<dyn Fn() -> DiskError + Send + Sync>;

struct State {
    nodes: BTreeMap<String, Node>,
    calls: Vec<Call>,
    failures: Vec<(Call, Failure)>,
    trashed: Vec<String>,
}

/// In-memory resource client.
///
/// Thread-safe via an internal mutex. All data is lost when dropped.
pub struct MemoryClient {
    state: Mutex<State>,
}

impl std::fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryClient")
            .field("nodes", &state.nodes.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parent_of(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(i) => Some(path[..i].to_string()),
        None => Some("/".to_string()),
    }
}

fn name_of(path: &str) -> String {
    segments(path).last().unwrap_or("/").to_string()
}

impl MemoryClient {
    /// Create a client holding only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::directory());
        Self {
            state: Mutex::new(State {
                nodes,
                calls: Vec::new(),
                failures: Vec::new(),
                trashed: Vec::new(),
            }),
        }
    }

    /// Seed a file, creating missing parent directories. Not recorded.
    pub fn insert_file(&self, path: &str, data: impl Into<Vec<u8>>) {
        let path = normalize(path);
        let mut state = self.state.lock();
        Self::ensure_parents(&mut state.nodes, &path);
        state.nodes.insert(path, Node::file(data.into()));
    }

    /// Seed a directory, creating missing parents. Not recorded.
    pub fn insert_dir(&self, path: &str) {
        let path = normalize(path);
        let mut state = self.state.lock();
        Self::ensure_parents(&mut state.nodes, &path);
        state.nodes.entry(path).or_insert_with(Node::directory);
    }

    fn ensure_parents(nodes: &mut BTreeMap<String, Node>, path: &str) {
        let mut current = String::new();
        let parts: Vec<&str> = segments(path).collect();
        for part in parts.iter().take(parts.len().saturating_sub(1)) {
            current.push('/');
            current.push_str(part);
            nodes.entry(current.clone()).or_insert_with(Node::directory);
        }
    }

    /// Whether a node exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.state.lock().nodes.contains_key(&normalize(path))
    }

    /// Kind of the node at `path`, if any.
    pub fn kind_of(&self, path: &str) -> Option<ResourceKind> {
        self.state.lock().nodes.get(&normalize(path)).map(|n| n.kind)
    }

    /// Content of the file at `path`, if any.
    pub fn file_data(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock();
        match state.nodes.get(&normalize(path)) {
            Some(node) if node.kind.is_file() => Some(node.data.clone()),
            _ => None,
        }
    }

    /// Number of nodes, excluding the root.
    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len() - 1
    }

    /// All node paths in sorted order, excluding the root.
    pub fn paths(&self) -> Vec<String> {
        self.state
            .lock()
            .nodes
            .keys()
            .filter(|p| p.as_str() != "/")
            .cloned()
            .collect()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Paths moved to the trash by non-permanent deletes.
    pub fn trashed(&self) -> Vec<String> {
        self.state.lock().trashed.clone()
    }

    /// Make every future call equal to `call` fail with `make()`.
    pub fn fail_on(&self, call: Call, make: impl Fn() -> DiskError + Send + Sync + 'static) {
        self.state.lock().failures.push((call, Box::new(make)));
    }

    /// Record `call` and return the injected failure for it, if any.
    fn enter(state: &mut State, call: Call) -> DiskResult<()> {
        let failure = state
            .failures
            .iter()
            .find(|(c, _)| *c == call)
            .map(|(_, make)| make());
        state.calls.push(call);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn to_resource(path: &str, node: &Node) -> Resource {
        Resource {
            path: path.to_string(),
            name: name_of(path),
            kind: node.kind,
            size: node.data.len() as u64,
            modified: node.modified,
            children: Vec::new(),
        }
    }

    /// Check that `path`'s parent exists and is a directory.
    fn check_parent(nodes: &BTreeMap<String, Node>, path: &str) -> DiskResult<()> {
        let Some(parent) = parent_of(path) else {
            return Ok(());
        };
        match nodes.get(&parent) {
            Some(node) if node.kind.is_dir() => Ok(()),
            Some(_) => Err(DiskError::not_a_directory(parent)),
            None => Err(DiskError::not_found(parent)),
        }
    }
}

#[async_trait]
impl ResourceClient for MemoryClient {
    async fn fetch_metadata(&self, path: &str, include_children: bool) -> DiskResult<Resource> {
        let path = normalize(path);
        let mut state = self.state.lock();
        Self::enter(
            &mut state,
            Call::FetchMetadata {
                path: path.clone(),
                children: include_children,
            },
        )?;

        let node = state
            .nodes
            .get(&path)
            .ok_or_else(|| DiskError::not_found(path.clone()))?;
        let mut res = Self::to_resource(&path, node);

        if include_children && node.kind.is_dir() {
            res.children = state
                .nodes
                .iter()
                .filter(|(p, _)| {
                    p.as_str() != "/" && parent_of(p).as_deref() == Some(path.as_str())
                })
                .map(|(p, n)| Self::to_resource(p, n))
                .collect();
        }
        Ok(res)
    }

    async fn fetch_file_bytes(&self, path: &str) -> DiskResult<Vec<u8>> {
        let path = normalize(path);
        let mut state = self.state.lock();
        Self::enter(&mut state, Call::FetchFileBytes(path.clone()))?;

        match state.nodes.get(&path) {
            Some(node) if node.kind.is_file() => Ok(node.data.clone()),
            Some(_) => Err(DiskError::is_a_directory(path)),
            None => Err(DiskError::not_found(path)),
        }
    }

    async fn upload_file_bytes(&self, path: &str, data: &[u8], overwrite: bool) -> DiskResult<()> {
        let path = normalize(path);
        let mut state = self.state.lock();
        Self::enter(
            &mut state,
            Call::Upload {
                path: path.clone(),
                overwrite,
            },
        )?;

        Self::check_parent(&state.nodes, &path)?;
        match state.nodes.get(&path) {
            Some(node) if node.kind.is_dir() => {
                return Err(DiskError::already_exists(path));
            }
            Some(_) if !overwrite => return Err(DiskError::already_exists(path)),
            _ => {}
        }
        state.nodes.insert(path, Node::file(data.to_vec()));
        Ok(())
    }

    async fn create_directory(&self, path: &str) -> DiskResult<()> {
        let path = normalize(path);
        let mut state = self.state.lock();
        Self::enter(&mut state, Call::CreateDirectory(path.clone()))?;

        if state.nodes.contains_key(&path) {
            return Err(DiskError::already_exists(path));
        }
        Self::check_parent(&state.nodes, &path)?;
        state.nodes.insert(path, Node::directory());
        Ok(())
    }

    async fn delete_node(&self, path: &str, permanent: bool) -> DiskResult<()> {
        let path = normalize(path);
        let mut state = self.state.lock();
        Self::enter(
            &mut state,
            Call::Delete {
                path: path.clone(),
                permanent,
            },
        )?;

        if path == "/" {
            return Err(DiskError::Api {
                status: 403,
                message: "cannot delete the disk root".to_string(),
            });
        }
        if !state.nodes.contains_key(&path) {
            return Err(DiskError::not_found(path));
        }

        let subtree = format!("{path}/");
        state
            .nodes
            .retain(|p, _| p != &path && !p.starts_with(&subtree));
        if !permanent {
            state.trashed.push(path);
        }
        Ok(())
    }

    async fn disk_info(&self) -> DiskResult<DiskInfo> {
        let mut state = self.state.lock();
        Self::enter(&mut state, Call::DiskInfo)?;

        let used_space = state.nodes.values().map(|n| n.data.len() as u64).sum();
        Ok(DiskInfo {
            total_space: MEMORY_TOTAL_SPACE,
            used_space,
            user: User {
                login: "memory".to_string(),
                name: "In-memory disk".to_string(),
                ..Default::default()
            },
            ..Default::default()
        })
    }
}
