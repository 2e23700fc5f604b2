//! In-process stand-in for the Google token, userinfo and Drive endpoints
//!
//! Each test starts its own server on an ephemeral port inside the test's
//! runtime, so tests never share Drive contents or call counters.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, patch, post},
};
use fieldmap::DriveConfig;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Code the token endpoint accepts but answers with an already expired token
pub const SHORT_LIVED_CODE: &str = "short-lived-code";
/// Code the token endpoint always rejects
pub const REJECTED_CODE: &str = "rejected-code";

pub const MOCK_USER_EMAIL: &str = "lab.member@example.com";
pub const MOCK_REFRESH_TOKEN: &str = "mock-refresh-token";

#[derive(Debug, Clone)]
pub struct MockFile {
    pub name: String,
    pub parents: Vec<String>,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl MockFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    used_codes: HashSet<String>,
    pub token_requests: usize,
    pub refresh_requests: usize,
    pub last_token_form: Option<HashMap<String, String>>,
    /// Refresh grants fail while set
    pub refresh_revoked: bool,
    issued_tokens: HashSet<String>,
    next_token: u64,

    pub files: HashMap<String, MockFile>,
    next_file_id: u64,
    pub list_requests: usize,
    pub last_drive_bearer: Option<String>,
}

impl MockState {
    fn issue_access_token(&mut self, prefix: &str) -> String {
        self.next_token += 1;
        let token = format!("{prefix}-{}", self.next_token);
        self.issued_tokens.insert(token.clone());
        token
    }

    /// Files (not folders) with the given name
    pub fn files_named(&self, name: &str) -> Vec<&MockFile> {
        self.files
            .values()
            .filter(|f| f.name == name && !f.is_folder())
            .collect()
    }

    pub fn folders_named(&self, name: &str) -> Vec<&MockFile> {
        self.files
            .values()
            .filter(|f| f.name == name && f.is_folder())
            .collect()
    }
}

type SharedState = Arc<Mutex<MockState>>;

pub struct MockServer {
    pub base_url: String,
    state: SharedState,
    _handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state: SharedState = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new()
            .route("/token", post(token))
            .route("/userinfo", get(userinfo))
            .route("/drive/v3/files", get(list_files).post(create_file))
            .route("/drive/v3/files/{id}", get(download_file).delete(delete_file))
            .route("/upload/drive/v3/files/{id}", patch(upload_file))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            _handle: handle,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    pub fn drive_config(&self) -> DriveConfig {
        DriveConfig::with_base_url(&self.base_url)
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn invalid_grant(description: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "invalid_grant", "error_description": description })),
    )
}

async fn token(
    State(state): State<SharedState>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().expect("mock state poisoned");
    state.token_requests += 1;
    state.last_token_form = Some(form.clone());

    if form.get("client_id").is_none_or(|v| v.is_empty())
        || form.get("client_secret").is_none_or(|v| v.is_empty())
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_client" })),
        );
    }

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => {
            let Some(code) = form.get("code").cloned() else {
                return invalid_grant("missing code");
            };
            if code == REJECTED_CODE || !state.used_codes.insert(code.clone()) {
                return invalid_grant("code already used or invalid");
            }
            let expires_in = if code == SHORT_LIVED_CODE { 0 } else { 3600 };
            let access_token = state.issue_access_token("mock-access");
            (
                StatusCode::OK,
                Json(json!({
                    "access_token": access_token,
                    "token_type": "Bearer",
                    "expires_in": expires_in,
                    "refresh_token": MOCK_REFRESH_TOKEN,
                    "scope": "openid email https://www.googleapis.com/auth/drive.file",
                    "id_token": "mock.id.token",
                })),
            )
        }
        Some("refresh_token") => {
            state.refresh_requests += 1;
            if state.refresh_revoked
                || form.get("refresh_token").map(String::as_str) != Some(MOCK_REFRESH_TOKEN)
            {
                return invalid_grant("refresh token revoked");
            }
            let access_token = state.issue_access_token("refreshed-access");
            (
                StatusCode::OK,
                Json(json!({
                    "access_token": access_token,
                    "token_type": "Bearer",
                    "expires_in": 3600,
                })),
            )
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        ),
    }
}

async fn userinfo(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let token = bearer(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let state = state.lock().expect("mock state poisoned");
    if !state.issued_tokens.contains(&token) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "id": "108234",
        "email": MOCK_USER_EMAIL,
        "name": "Lab Member",
    })))
}

/// The parts of a Drive `q` expression that the client sends
#[derive(Debug, PartialEq)]
struct SearchQuery {
    name: String,
    parent: Option<String>,
    folder: bool,
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_query(q: &str) -> Option<SearchQuery> {
    let rest = q.strip_prefix("name = '")?;
    let (name, rest) = rest.split_once("' and trashed = false")?;
    let parent = rest
        .strip_prefix(" and '")
        .and_then(|r| r.split_once("' in parents"))
        .map(|(parent, _)| unescape(parent));
    Some(SearchQuery {
        name: unescape(name),
        parent,
        folder: rest.contains("mimeType = '"),
    })
}

async fn list_files(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let token = bearer(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let mut state = state.lock().expect("mock state poisoned");
    state.list_requests += 1;
    state.last_drive_bearer = Some(token);

    let query = params
        .get("q")
        .and_then(|q| parse_query(q))
        .ok_or(StatusCode::BAD_REQUEST)?;

    let mut matches: Vec<(&String, &MockFile)> = state
        .files
        .iter()
        .filter(|(_, f)| f.name == query.name && f.is_folder() == query.folder)
        .filter(|(_, f)| match &query.parent {
            Some(parent) => f.parents.contains(parent),
            None => true,
        })
        .collect();
    matches.sort_by(|a, b| a.0.cmp(b.0));

    let files: Vec<Value> = matches
        .into_iter()
        .map(|(id, f)| json!({ "id": id, "name": f.name }))
        .collect();
    Ok(Json(json!({ "files": files })))
}

async fn create_file(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(metadata): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let token = bearer(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let mut state = state.lock().expect("mock state poisoned");
    state.last_drive_bearer = Some(token);

    let name = metadata["name"]
        .as_str()
        .ok_or(StatusCode::BAD_REQUEST)?
        .to_string();
    let parents = metadata["parents"]
        .as_array()
        .map(|p| {
            p.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let mime_type = metadata["mimeType"]
        .as_str()
        .unwrap_or("application/octet-stream")
        .to_string();

    state.next_file_id += 1;
    let id = format!("file{:04}", state.next_file_id);
    state.files.insert(
        id.clone(),
        MockFile {
            name,
            parents,
            mime_type,
            content: Vec::new(),
        },
    );
    Ok(Json(json!({ "id": id })))
}

async fn upload_file(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let token = bearer(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    if params.get("uploadType").map(String::as_str) != Some("media") {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut state = state.lock().expect("mock state poisoned");
    state.last_drive_bearer = Some(token);
    let file = state.files.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    file.content = body.to_vec();
    Ok(Json(json!({ "id": id })))
}

async fn download_file(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Vec<u8>, StatusCode> {
    let token = bearer(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    if params.get("alt").map(String::as_str) != Some("media") {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut state = state.lock().expect("mock state poisoned");
    state.last_drive_bearer = Some(token);
    state
        .files
        .get(&id)
        .map(|f| f.content.clone())
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_file(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> StatusCode {
    let Some(token) = bearer(&headers) else {
        return StatusCode::UNAUTHORIZED;
    };
    let mut state = state.lock().expect("mock state poisoned");
    state.last_drive_bearer = Some(token);
    match state.files.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_with_parent() {
        let q = "name = 'Bob\\'s bench' and trashed = false and 'file0001' in parents \
                 and mimeType = 'application/vnd.google-apps.folder'";
        assert_eq!(
            parse_query(q),
            Some(SearchQuery {
                name: "Bob's bench".to_string(),
                parent: Some("file0001".to_string()),
                folder: true,
            })
        );
    }

    #[test]
    fn test_parse_query_root_file() {
        let q = "name = 'manifest.json' and trashed = false \
                 and mimeType != 'application/vnd.google-apps.folder'";
        let parsed = parse_query(q).unwrap();
        assert_eq!(parsed.parent, None);
        assert!(!parsed.folder);
    }
}
