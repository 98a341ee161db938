use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// The only key the mock accepts.
pub const API_KEY: &str = "simMockKey";

/// Directory that exists on the `data` connector from the start.
pub const HOME: &str = "data/.my";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Acl {
    #[serde(default)]
    pub read: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileEntry {
    pub filename: String,
    pub size: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FolderEntry {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateDir {
    pub name: String,
    #[serde(default)]
    pub acl: Option<Acl>,
}

#[derive(Deserialize)]
pub struct UpdateDir {
    pub acl: Acl,
}

/// Connector storage keyed by `<connector>/<path>`.
#[derive(Debug)]
pub struct Storage {
    dirs: BTreeMap<String, Acl>,
    files: BTreeMap<String, Vec<u8>>,
}

impl Default for Storage {
    fn default() -> Self {
        let mut dirs = BTreeMap::new();
        dirs.insert(HOME.to_string(), Acl::default());
        Self {
            dirs,
            files: BTreeMap::new(),
        }
    }
}

impl Storage {
    fn children<'a, T>(map: &'a BTreeMap<String, T>, dir: &'a str) -> impl Iterator<Item = (&'a String, &'a T)> {
        map.iter()
            .filter(move |(key, _)| parent(key) == Some(dir))
    }

    fn has_children(&self, dir: &str) -> bool {
        let prefix = format!("{dir}/");
        self.dirs.keys().any(|k| k.starts_with(&prefix)) || self.files.keys().any(|k| k.starts_with(&prefix))
    }

    fn remove_tree(&mut self, dir: &str) -> usize {
        let prefix = format!("{dir}/");
        let before = self.files.len();
        self.files.retain(|k, _| !k.starts_with(&prefix));
        self.dirs.retain(|k, _| k != dir && !k.starts_with(&prefix));
        before - self.files.len()
    }
}

pub type Db = Arc<RwLock<Storage>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Storage::default()));
    Router::new()
        .route("/v1/algo/{*path}", post(call_algo))
        .route("/v1/connector/{connector}/{*path}", any(connector))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn parent(key: &str) -> Option<&str> {
    key.rsplit_once('/').map(|(parent, _)| parent)
}

fn name(key: &str) -> &str {
    key.rsplit_once('/').map(|(_, name)| name).unwrap_or(key)
}

/// `data/.my/a.txt` -> `data://.my/a.txt`.
fn data_uri(key: &str) -> String {
    key.replacen('/', "://", 1)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Simple {API_KEY}"))
}

fn error_body(message: &str) -> Value {
    json!({"error": {"message": message}})
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(error_body("authorization required"))).into_response()
}

fn with_data_type(mut response: Response, data_type: &'static str) -> Response {
    response
        .headers_mut()
        .insert("X-Data-Type", HeaderValue::from_static(data_type));
    response
}

fn directory(status: StatusCode, body: Value) -> Response {
    with_data_type((status, Json(body)).into_response(), "directory")
}

async fn call_algo(
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    tracing::debug!(%path, ?query, "algo call");

    let input: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let result = match path.split('/').take(2).collect::<Vec<_>>().as_slice() {
        ["util", "Echo"] => input,
        ["util", "Length"] => json!(input.as_object().map(|m| m.len()).unwrap_or(0)),
        ["util", "Fail"] => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": {
                    "message": "algorithm raised an exception",
                    "type": "AlgorithmError",
                    "error_subcode": 3
                }})),
            )
                .into_response()
        }
        _ => {
            return (
                StatusCode::NOT_FOUND,
                Json(error_body(&format!("algorithm algo://{path} not found"))),
            )
                .into_response()
        }
    };

    match query.get("output").map(String::as_str) {
        Some("void") => Json(json!({
            "async": "void",
            "request_id": Uuid::new_v4().to_string(),
        }))
        .into_response(),
        Some("raw") => result.to_string().into_response(),
        _ => {
            let mut metadata = json!({"content_type": "json", "duration": 0.001});
            if query.get("stdout").map(String::as_str) == Some("1") {
                metadata["stdout"] = json!(format!("called {path}\n"));
            }
            Json(json!({"result": result, "metadata": metadata})).into_response()
        }
    }
}

async fn connector(
    State(db): State<Db>,
    method: Method,
    Path((connector, path)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let key = format!("{connector}/{}", path.trim_matches('/'));
    tracing::debug!(%method, %key, "connector call");

    match method {
        Method::GET | Method::HEAD => read(&db, &key, &query).await,
        Method::POST => create_dir(&db, &key, &body).await,
        Method::PATCH => update_dir(&db, &key, &body).await,
        Method::PUT => put_file(&db, &key, body).await,
        Method::DELETE => delete(&db, &key, &query).await,
        _ => (StatusCode::METHOD_NOT_ALLOWED, Json(error_body("method not allowed"))).into_response(),
    }
}

async fn read(db: &Db, key: &str, query: &HashMap<String, String>) -> Response {
    let storage = db.read().await;

    if let Some(content) = storage.files.get(key) {
        let mut response = content.clone().into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        return with_data_type(response, "file");
    }

    let Some(acl) = storage.dirs.get(key) else {
        return (StatusCode::NOT_FOUND, Json(error_body("path not found"))).into_response();
    };

    let files: Vec<FileEntry> = Storage::children(&storage.files, key)
        .map(|(k, content)| FileEntry {
            filename: name(k).to_string(),
            size: content.len() as u64,
        })
        .collect();
    let folders: Vec<FolderEntry> = Storage::children(&storage.dirs, key)
        .map(|(k, _)| FolderEntry {
            name: name(k).to_string(),
        })
        .collect();

    let mut listing = json!({"files": files, "folders": folders});
    if query.get("acl").map(String::as_str) == Some("true") {
        listing["acl"] = json!(acl);
    }
    directory(StatusCode::OK, listing)
}

async fn create_dir(db: &Db, key: &str, body: &[u8]) -> Response {
    let Ok(input) = serde_json::from_slice::<CreateDir>(body) else {
        return directory(StatusCode::BAD_REQUEST, error_body("expected a directory name"));
    };
    let mut storage = db.write().await;
    if !storage.dirs.contains_key(key) {
        return directory(StatusCode::NOT_FOUND, error_body("parent directory not found"));
    }
    let child = format!("{key}/{}", input.name);
    if storage.dirs.contains_key(&child) {
        return directory(StatusCode::BAD_REQUEST, error_body("directory already exists"));
    }
    storage.dirs.insert(child.clone(), input.acl.unwrap_or_default());
    directory(StatusCode::OK, json!({"result": data_uri(&child)}))
}

async fn update_dir(db: &Db, key: &str, body: &[u8]) -> Response {
    let Ok(input) = serde_json::from_slice::<UpdateDir>(body) else {
        return directory(StatusCode::BAD_REQUEST, error_body("expected an acl"));
    };
    let mut storage = db.write().await;
    match storage.dirs.get_mut(key) {
        Some(acl) => {
            *acl = input.acl;
            directory(StatusCode::OK, json!({"acl": acl}))
        }
        None => directory(StatusCode::NOT_FOUND, error_body("path not found")),
    }
}

async fn put_file(db: &Db, key: &str, body: Bytes) -> Response {
    let mut storage = db.write().await;
    let parent_exists = parent(key).is_some_and(|p| storage.dirs.contains_key(p));
    if !parent_exists {
        return (StatusCode::NOT_FOUND, Json(error_body("parent directory not found"))).into_response();
    }
    storage.files.insert(key.to_string(), body.to_vec());
    Json(json!({"result": data_uri(key)})).into_response()
}

async fn delete(db: &Db, key: &str, query: &HashMap<String, String>) -> Response {
    let mut storage = db.write().await;

    if storage.files.remove(key).is_some() {
        return Json(json!({"result": {"deleted": 1}})).into_response();
    }
    if !storage.dirs.contains_key(key) {
        return (StatusCode::NOT_FOUND, Json(error_body("path not found"))).into_response();
    }

    let force = query.get("force").map(String::as_str) == Some("true");
    if storage.has_children(key) && !force {
        return directory(
            StatusCode::BAD_REQUEST,
            json!({"error": {"message": "directory not empty", "deleted": 0}}),
        );
    }
    let deleted = storage.remove_tree(key);
    directory(StatusCode::OK, json!({"result": {"deleted": deleted}}))
}
