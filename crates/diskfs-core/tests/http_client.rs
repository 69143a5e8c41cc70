//! `HttpClient` against an in-process fake of the cloud disk REST API.
//!
//! The fake keeps a flat path -> node map, prefixes paths with `disk:` the
//! way the real service does, hands out transfer links pointing back at
//! itself, and records every API request so tests can check paging and
//! query parameters.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};

use diskfs_core::{
    DiskConfig, DiskError, DiskFs, HttpClient, ResourceClient, ResourceKind,
};

const TOKEN: &str = "test-token";
const MODIFIED: &str = "2024-05-01T12:00:00+00:00";

// ============================================================================
// Fake server
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct Params {
    #[serde(default)]
    path: String,
    limit: Option<u32>,
    offset: Option<u32>,
    fields: Option<String>,
    overwrite: Option<String>,
    permanently: Option<String>,
}

#[derive(Debug, Clone)]
struct Request {
    route: &'static str,
    params: Params,
}

struct Fake {
    base_url: String,
    /// `None` marks a directory.
    nodes: Mutex<BTreeMap<String, Option<Vec<u8>>>>,
    requests: Mutex<Vec<Request>>,
}

impl Fake {
    fn record(&self, route: &'static str, params: &Params) {
        self.requests.lock().push(Request {
            route,
            params: params.clone(),
        });
    }

    fn requests(&self, route: &str) -> Vec<Params> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.route == route)
            .map(|r| r.params.clone())
            .collect()
    }

    fn seed_dir(&self, path: &str) {
        self.nodes.lock().insert(path.to_string(), None);
    }

    fn seed_file(&self, path: &str, data: &[u8]) {
        self.nodes.lock().insert(path.to_string(), Some(data.to_vec()));
    }

    fn contains(&self, path: &str) -> bool {
        self.nodes.lock().contains_key(path)
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

fn api_error(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "message": message, "description": message, "error": error })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("OAuth {TOKEN}"))
}

fn resource_json(path: &str, node: &Option<Vec<u8>>) -> Value {
    let name = if path == "/" {
        "disk"
    } else {
        path.rsplit('/').next().unwrap_or_default()
    };
    let mut value = json!({
        "name": name,
        "path": format!("disk:{path}"),
        "type": if node.is_none() { "dir" } else { "file" },
        "modified": MODIFIED,
    });
    if let Some(data) = node {
        value["size"] = json!(data.len());
    }
    value
}

async fn disk_info(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "UnauthorizedError", "Unauthorized");
    }
    Json(json!({
        "trash_size": 12,
        "total_space": 10_737_418_240u64,
        "used_space": 1024,
        "system_folders": { "downloads": "disk:/Downloads/" },
        "user": { "login": "tester", "display_name": "Test User", "uid": "42", "country": "ru" },
        "revision": 7
    }))
    .into_response()
}

async fn get_resource(
    State(fake): State<Arc<Fake>>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Response {
    fake.record("resources", &params);
    if !authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "UnauthorizedError", "Unauthorized");
    }
    if params.path == "/garbage" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }

    let nodes = fake.nodes.lock();
    let Some(node) = nodes.get(&params.path) else {
        return api_error(StatusCode::NOT_FOUND, "DiskNotFoundError", "Resource not found.");
    };
    let mut value = resource_json(&params.path, node);

    let limit = params.limit.unwrap_or(20) as usize;
    if node.is_none() && limit > 0 {
        let children: Vec<Value> = nodes
            .iter()
            .filter(|(p, _)| p.as_str() != "/" && parent_of(p) == params.path)
            .map(|(p, n)| resource_json(p, n))
            .collect();
        let offset = params.offset.unwrap_or(0) as usize;
        let items: Vec<Value> = children.iter().skip(offset).take(limit).cloned().collect();
        value["_embedded"] = json!({
            "path": format!("disk:{}", params.path),
            "items": items,
            "limit": limit,
            "offset": offset,
            "total": children.len(),
            "sort": "",
        });
    }
    Json(value).into_response()
}

async fn mkdir(State(fake): State<Arc<Fake>>, Query(params): Query<Params>) -> Response {
    fake.record("mkdir", &params);
    let mut nodes = fake.nodes.lock();
    if nodes.contains_key(&params.path) {
        return api_error(
            StatusCode::CONFLICT,
            "DiskPathPointsToExistentDirectoryError",
            "Specified path points to existent directory.",
        );
    }
    if !nodes.contains_key(parent_of(&params.path)) {
        return api_error(
            StatusCode::CONFLICT,
            "DiskPathDoesntExistsError",
            "Specified path doesn't exist.",
        );
    }
    nodes.insert(params.path.clone(), None);
    (
        StatusCode::CREATED,
        Json(json!({
            "href": format!("{}/resources?path={}", fake.base_url, params.path),
            "method": "GET",
            "templated": false,
        })),
    )
        .into_response()
}

async fn delete(State(fake): State<Arc<Fake>>, Query(params): Query<Params>) -> Response {
    fake.record("delete", &params);
    let mut nodes = fake.nodes.lock();
    if !nodes.contains_key(&params.path) {
        return api_error(StatusCode::NOT_FOUND, "DiskNotFoundError", "Resource not found.");
    }
    let subtree = format!("{}/", params.path);
    nodes.retain(|p, _| p != &params.path && !p.starts_with(&subtree));
    if params.path.starts_with("/async") {
        return (
            StatusCode::ACCEPTED,
            Json(json!({
                "href": format!("{}/operations/1", fake.base_url),
                "method": "GET",
                "templated": false,
            })),
        )
            .into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn download_link(State(fake): State<Arc<Fake>>, Query(params): Query<Params>) -> Response {
    fake.record("download", &params);
    match fake.nodes.lock().get(&params.path) {
        Some(Some(_)) => Json(json!({
            "href": format!("{}/blob?path={}", fake.base_url, params.path),
            "method": "GET",
            "templated": false,
        }))
        .into_response(),
        Some(None) => api_error(StatusCode::BAD_REQUEST, "DiskIsADirectoryError", "is a directory"),
        None => api_error(StatusCode::NOT_FOUND, "DiskNotFoundError", "Resource not found."),
    }
}

async fn upload_link(State(fake): State<Arc<Fake>>, Query(params): Query<Params>) -> Response {
    fake.record("upload", &params);
    let nodes = fake.nodes.lock();
    if nodes.contains_key(&params.path) && params.overwrite.as_deref() != Some("true") {
        return api_error(
            StatusCode::CONFLICT,
            "DiskResourceAlreadyExistsError",
            "Resource already exists.",
        );
    }
    if !nodes.contains_key(parent_of(&params.path)) {
        return api_error(
            StatusCode::CONFLICT,
            "DiskPathDoesntExistsError",
            "Specified path doesn't exist.",
        );
    }
    Json(json!({
        "operation_id": "op-1",
        "href": format!("{}/blob?path={}", fake.base_url, params.path),
        "method": "PUT",
        "templated": false,
    }))
    .into_response()
}

async fn blob_get(State(fake): State<Arc<Fake>>, Query(params): Query<Params>) -> Response {
    match fake.nodes.lock().get(&params.path) {
        Some(Some(data)) => data.clone().into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn blob_put(
    State(fake): State<Arc<Fake>>,
    Query(params): Query<Params>,
    body: Bytes,
) -> Response {
    fake.nodes.lock().insert(params.path, Some(body.to_vec()));
    StatusCode::CREATED.into_response()
}

/// Start the fake and return it together with a client pointed at it.
async fn start(page_size: u32) -> (Arc<Fake>, HttpClient) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let fake = Arc::new(Fake {
        base_url: format!("http://{addr}"),
        nodes: Mutex::new(BTreeMap::from([("/".to_string(), None)])),
        requests: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/v1/disk", get(disk_info))
        .route(
            "/v1/disk/resources",
            get(get_resource).put(mkdir).delete(delete),
        )
        .route("/v1/disk/resources/download", get(download_link))
        .route("/v1/disk/resources/upload", get(upload_link))
        .route("/blob", get(blob_get).put(blob_put))
        .with_state(fake.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = DiskConfig::default().with_api_base(format!("http://{addr}/v1/disk"));
    config.page_size = page_size;
    let client = HttpClient::new(TOKEN, &config).unwrap();
    (fake, client)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn stat_normalizes_root_and_paths() {
    let (fake, client) = start(100).await;
    fake.seed_dir("/docs");
    fake.seed_file("/docs/a.txt", b"hello");

    let fs = DiskFs::new(client);
    let root = fs.stat("/").await.unwrap();
    assert_eq!(root.name, "/");
    assert_eq!(root.path, "/");
    assert!(root.is_dir());

    let file = fs.stat("/docs/a.txt").await.unwrap();
    assert_eq!(file.path, "/docs/a.txt");
    assert_eq!(file.name, "a.txt");
    assert_eq!(file.size, 5);
    assert_eq!(file.kind, ResourceKind::File);
}

#[tokio::test]
async fn stat_requests_minimal_fields() {
    let (fake, client) = start(100).await;
    fake.seed_file("/f", b"x");

    client.fetch_metadata("/f", false).await.unwrap();
    let reqs = fake.requests("resources");
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].limit, Some(0));
    assert_eq!(reqs[0].fields.as_deref(), Some("name,path,type,size,modified"));
}

#[tokio::test]
async fn children_are_paged_until_total() {
    let (fake, client) = start(2).await;
    fake.seed_dir("/d");
    for name in ["a", "b", "c", "d", "e"] {
        fake.seed_file(&format!("/d/{name}"), name.as_bytes());
    }

    let res = client.fetch_metadata("/d", true).await.unwrap();
    let paths: Vec<_> = res.children.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, vec!["/d/a", "/d/b", "/d/c", "/d/d", "/d/e"]);

    let offsets: Vec<_> = fake
        .requests("resources")
        .iter()
        .map(|p| p.offset.unwrap_or(0))
        .collect();
    assert_eq!(offsets, vec![0, 2, 4]);
}

#[tokio::test]
async fn write_then_read_through_links() {
    let (fake, client) = start(100).await;
    let fs = DiskFs::new(client);

    fs.write_file("/note.txt", b"remote bytes").await.unwrap();
    assert_eq!(fake.requests("upload")[0].overwrite.as_deref(), Some("true"));

    let mut file = fs.open("/note.txt").await.unwrap();
    assert_eq!(file.read_to_end().await.unwrap(), b"remote bytes");
    assert_eq!(fs.read_file("/note.txt").await.unwrap(), b"remote bytes");
}

#[tokio::test]
async fn exclusive_write_conflicts() {
    let (fake, client) = start(100).await;
    fake.seed_file("/taken", b"mine");
    let fs = DiskFs::new(client);

    let err = fs.write_file_exclusive("/taken", b"yours").await.unwrap_err();
    assert!(matches!(err.kind(), DiskError::AlreadyExists(_)));
    assert_eq!(fake.requests("upload")[0].overwrite, None);
}

#[tokio::test]
async fn mkdir_maps_conflicts() {
    let (fake, client) = start(100).await;
    let fs = DiskFs::new(client);

    let err = fs.mkdir("/a/b").await.unwrap_err();
    assert!(err.is_not_found());

    fs.mkdir("/a").await.unwrap();
    let err = fs.mkdir("/a").await.unwrap_err();
    assert!(matches!(err.kind(), DiskError::AlreadyExists(_)));

    fs.mkdir_all("/a/b/c").await.unwrap();
    assert!(fake.contains("/a/b/c"));
}

#[tokio::test]
async fn remove_all_deletes_permanently_bottom_up() {
    let (fake, client) = start(100).await;
    fake.seed_dir("/t");
    fake.seed_dir("/t/sub");
    fake.seed_file("/t/sub/f", b"f");
    fake.seed_file("/t/g", b"g");

    let fs = DiskFs::new(client);
    fs.remove_all("/t").await.unwrap();

    let deletes = fake.requests("delete");
    let paths: Vec<_> = deletes.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["/t/g", "/t/sub/f", "/t/sub", "/t"]);
    assert!(deletes.iter().all(|p| p.permanently.as_deref() == Some("true")));
    assert!(!fake.contains("/t"));
}

#[tokio::test]
async fn async_delete_is_accepted() {
    let (fake, client) = start(100).await;
    fake.seed_dir("/async-dir");

    client.delete_node("/async-dir", false).await.unwrap();
    assert_eq!(fake.requests("delete")[0].permanently, None);
    assert!(!fake.contains("/async-dir"));
}

#[tokio::test]
async fn disk_info_decodes() {
    let (_fake, client) = start(100).await;
    let fs = DiskFs::connect(Arc::new(client)).await.unwrap();

    let info = fs.disk_info().await.unwrap();
    assert_eq!(info.total_space, 10_737_418_240);
    assert_eq!(info.trash_size, 12);
    assert_eq!(info.revision, 7);
    assert_eq!(info.system_folders["downloads"], "disk:/Downloads/");
    assert_eq!(fs.user_info().await.unwrap().name, "Test User");
}

#[tokio::test]
async fn bad_token_is_an_api_error() {
    let (fake, _client) = start(100).await;
    let config = DiskConfig::default().with_api_base(format!("{}/v1/disk", fake.base_url));
    let client = HttpClient::new("wrong", &config).unwrap();

    match client.disk_info().await {
        Err(DiskError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("Unauthorized"));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(DiskFs::connect(Arc::new(client)).await.is_err());
}

#[tokio::test]
async fn missing_and_undecodable_responses() {
    let (_fake, client) = start(100).await;

    assert!(client.fetch_metadata("/nope", false).await.unwrap_err().is_not_found());
    match client.fetch_metadata("/garbage", false).await {
        Err(DiskError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let config = DiskConfig::default().with_api_base("http://127.0.0.1:1/v1/disk");
    let client = HttpClient::new(TOKEN, &config).unwrap();
    assert!(matches!(
        client.disk_info().await,
        Err(DiskError::Network(_))
    ));
}

#[test]
fn from_config_requires_token() {
    assert!(HttpClient::from_config(&DiskConfig::default()).is_err());
    assert!(HttpClient::from_config(&DiskConfig::default().with_token("t")).is_ok());
}
