use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{any, post},
    Form, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub const TOKEN_PATH: &str = "/oauth2/default/v1/token";
// Kept separate from the client crate's copy; integration tests catch drift.
pub const PERSON_NAMES_QUERY: &str = "MATCH (p:Person) RETURN p.name AS name";
pub const DEFAULT_DATABASE: &str = "neo4j";

/// Credentials and data the mock identity provider and database serve.
#[derive(Clone, Debug)]
pub struct MockConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Scopes the token endpoint grants. Empty means any scope.
    pub scopes: Vec<String>,
    /// Fixed token to issue. A fresh UUID is issued per request when `None`.
    pub access_token: Option<String>,
    pub people: Vec<String>,
    /// Shared request counters, readable by the test that built the config.
    pub stats: Arc<MockStats>,
}

/// How often each route was hit.
#[derive(Debug, Default)]
pub struct MockStats {
    pub token_requests: AtomicUsize,
    pub tokens_issued: AtomicUsize,
    pub query_requests: AtomicUsize,
}

impl MockStats {
    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn tokens_issued(&self) -> usize {
        self.tokens_issued.load(Ordering::SeqCst)
    }

    pub fn query_requests(&self) -> usize {
        self.query_requests.load(Ordering::SeqCst)
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            scopes: vec!["neo4j".to_string()],
            access_token: None,
            people: vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string()],
            stats: Arc::default(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<MockConfig>,
    issued: Arc<RwLock<HashSet<String>>>,
}

#[derive(Deserialize)]
pub struct TokenForm {
    pub grant_type: String,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub expires_in: u64,
    pub access_token: String,
    pub scope: String,
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub statement: String,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        issued: Arc::new(RwLock::new(HashSet::new())),
    };
    Router::new()
        .route(TOKEN_PATH, post(issue_token))
        .route("/db/{database}/query/v2", post(run_query))
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/delay/{millis}", any(delay))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

fn oauth_error(status: StatusCode, error: &str, description: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "error": error, "error_description": description })),
    )
}

fn neo4j_error(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "errors": [{ "code": code, "message": message }] })),
    )
}

/// `(username, password)` from an `Authorization: Basic ...` header.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn issue_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<TokenForm>,
) -> (StatusCode, Json<Value>) {
    let config = &state.config;
    config.stats.token_requests.fetch_add(1, Ordering::SeqCst);
    match basic_credentials(&headers) {
        Some((id, secret)) if id == config.client_id && secret == config.client_secret => {}
        _ => {
            warn!("rejected client credentials");
            return oauth_error(
                StatusCode::UNAUTHORIZED,
                "invalid_client",
                "Invalid value for 'client_id' parameter.",
            );
        }
    }

    if form.grant_type != "client_credentials" {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            "The authorization grant type is not supported by the authorization server.",
        );
    }

    let scope = form.scope.unwrap_or_default();
    let granted = config.scopes.is_empty()
        || scope
            .split_whitespace()
            .all(|requested| config.scopes.iter().any(|allowed| allowed == requested));
    if !granted || scope.trim().is_empty() {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_scope",
            "One or more scopes are not configured for the authorization server resource.",
        );
    }

    let access_token = config
        .access_token
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    state.issued.write().await.insert(access_token.clone());
    config.stats.tokens_issued.fetch_add(1, Ordering::SeqCst);
    info!(client_id = %config.client_id, scope = %scope, "issued access token");

    let body = TokenResponse {
        token_type: "Bearer".to_string(),
        expires_in: 3600,
        access_token,
        scope,
    };
    (StatusCode::OK, Json(json!(body)))
}

async fn run_query(
    State(state): State<AppState>,
    Path(database): Path<String>,
    headers: HeaderMap,
    Json(request): Json<QueryRequest>,
) -> (StatusCode, Json<Value>) {
    state.config.stats.query_requests.fetch_add(1, Ordering::SeqCst);
    let authorized = match bearer_token(&headers) {
        Some(token) => state.issued.read().await.contains(token),
        None => false,
    };
    if !authorized {
        return neo4j_error(
            StatusCode::UNAUTHORIZED,
            "Neo.ClientError.Security.Unauthorized",
            "The client is unauthorized due to authentication failure.",
        );
    }

    if database != DEFAULT_DATABASE {
        return neo4j_error(
            StatusCode::NOT_FOUND,
            "Neo.ClientError.Database.DatabaseNotFound",
            &format!("Database does not exist. Database name: '{database}'."),
        );
    }

    if request.statement.trim() != PERSON_NAMES_QUERY {
        return neo4j_error(
            StatusCode::BAD_REQUEST,
            "Neo.ClientError.Statement.SyntaxError",
            "The mock database only answers the person names query.",
        );
    }

    let values: Vec<Value> = state.config.people.iter().map(|name| json!([name])).collect();
    (
        StatusCode::OK,
        Json(json!({
            "data": { "fields": ["name"], "values": values },
            "bookmarks": [format!("FB:{}", Uuid::new_v4().simple())]
        })),
    )
}

/// Responds 200 with the request body unchanged.
async fn echo(headers: HeaderMap, body: String) -> (StatusCode, HeaderMap, String) {
    let mut response_headers = HeaderMap::new();
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        response_headers.insert(header::CONTENT_TYPE, content_type.clone());
    }
    (StatusCode::OK, response_headers, body)
}

/// Responds with the requested status and the request body.
async fn status(Path(code): Path<u16>, body: String) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, body))
}

/// Waits `millis` before answering `{}`.
async fn delay(Path(millis): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(json!({}))
}
