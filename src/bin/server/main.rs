//! Dietsync Remote Store Server
//!
//! Holds one diet state document per user and assigns its modification
//! timestamp. Clients pull on login and push the whole state after edits.
//!
//! # Configuration
//!
//! Environment variables:
//! - `DIETSYNC_PORT`: Port to listen on (default: 8080)
//! - `DIETSYNC_SERVER_DATA_DIR`: Directory to store documents (default: ~/.local/share/dietsync-server)
//! - `DIETSYNC_SERVER_CONFIG`: Path to config file (default: ~/.config/dietsync-server/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! api_keys:
//!   - key: "your-secret-key-here"
//!     user_id: "ana"
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET /v1/diet-states/{user_id}`: Fetch a user's document (auth required)
//! - `PUT /v1/diet-states/{user_id}`: Replace a user's document (auth required)

mod storage;

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storage::{DocumentStore, StorageError};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct ApiKeyEntry {
    key: String,
    user_id: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    api_keys: Vec<ApiKeyEntry>,
}

#[derive(Debug, Clone)]
struct Config {
    port: u16,
    data_dir: PathBuf,
    config_path: PathBuf,
}

impl Config {
    fn from_env() -> Self {
        let port = std::env::var("DIETSYNC_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("DIETSYNC_SERVER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("dietsync-server")
            });

        let config_path = std::env::var("DIETSYNC_SERVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("dietsync-server")
                    .join("config.yaml")
            });

        Self {
            port,
            data_dir,
            config_path,
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Authenticated user, added to request extensions after auth
#[derive(Debug, Clone)]
struct AuthUser {
    user_id: String,
}

/// API key store - maps key -> AuthUser
#[derive(Debug, Clone, Default)]
struct ApiKeyStore {
    keys: HashMap<String, AuthUser>,
}

impl ApiKeyStore {
    fn from_entries(entries: Vec<ApiKeyEntry>) -> Self {
        let keys = entries
            .into_iter()
            .map(|entry| {
                (
                    entry.key,
                    AuthUser {
                        user_id: entry.user_id,
                    },
                )
            })
            .collect();
        Self { keys }
    }

    fn load(config_path: &FsPath) -> Self {
        let contents = match std::fs::read_to_string(config_path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
                tracing::warn!("No API keys loaded - all authenticated requests will fail");
                return Self::default();
            }
        };

        match serde_yaml::from_str::<ConfigFile>(&contents) {
            Ok(config) => {
                let store = Self::from_entries(config.api_keys);
                tracing::info!("Loaded {} API key(s)", store.keys.len());
                store
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file: {}", e);
                Self::default()
            }
        }
    }

    fn validate(&self, key: &str) -> Option<AuthUser> {
        self.keys.get(key).cloned()
    }
}

#[derive(Clone)]
struct AppState {
    api_keys: Arc<ApiKeyStore>,
    documents: Arc<DocumentStore>,
}

#[derive(Serialize)]
struct ApiError {
    error: &'static str,
    message: String,
}

fn api_error(status: StatusCode, error: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            error,
            message: message.into(),
        }),
    )
        .into_response()
}

async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(key) => key,
            None => {
                return api_error(
                    StatusCode::UNAUTHORIZED,
                    "invalid_auth",
                    "Authorization header must use Bearer scheme",
                )
            }
        },
        None => {
            return api_error(
                StatusCode::UNAUTHORIZED,
                "missing_auth",
                "Authorization header required",
            )
        }
    };

    match state.api_keys.validate(api_key) {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => api_error(StatusCode::UNAUTHORIZED, "invalid_key", "Invalid API key"),
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct UpsertRequest {
    state: Value,
}

/// Users may only touch their own document.
fn check_owner(user: &AuthUser, user_id: &str) -> Result<(), Response> {
    if user.user_id == user_id {
        Ok(())
    } else {
        Err(api_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "API key does not grant access to this user",
        ))
    }
}

fn storage_error(e: StorageError) -> Response {
    match e {
        StorageError::InvalidUserId(id) => api_error(
            StatusCode::BAD_REQUEST,
            "invalid_user",
            format!("Invalid user ID: {}", id),
        ),
        other => {
            tracing::error!("Storage error: {}", other);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "Failed to access the document store",
            )
        }
    }
}

async fn get_diet_state(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Response {
    if let Err(response) = check_owner(&user, &user_id) {
        return response;
    }

    match state.documents.load(&user_id) {
        Ok(Some(document)) => Json(document).into_response(),
        Ok(None) => api_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "No diet state stored for this user",
        ),
        Err(e) => storage_error(e),
    }
}

async fn put_diet_state(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(body): Json<UpsertRequest>,
) -> Response {
    if let Err(response) = check_owner(&user, &user_id) {
        return response;
    }
    if !body.state.is_object() {
        return api_error(
            StatusCode::BAD_REQUEST,
            "invalid_state",
            "state must be a JSON object",
        );
    }

    match state.documents.save(&user_id, body.state) {
        Ok(document) => {
            tracing::info!(user = %user_id, updated_at = %document.updated_at, "Stored diet state");
            Json(document).into_response()
        }
        Err(e) => storage_error(e),
    }
}

fn app(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route(
            "/v1/diet-states/{user_id}",
            get(get_diet_state).put(put_diet_state),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dietsync_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        tracing::error!("Failed to create data directory: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Config file: {}", config.config_path.display());

    let state = AppState {
        api_keys: Arc::new(ApiKeyStore::load(&config.config_path)),
        documents: Arc::new(DocumentStore::new(config.data_dir)),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app(state)).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use dietsync_core::{
        DietSession, DietState, HttpRemote, LoginOutcome, ManualClock, MemoryStore, SyncEngine,
        SyncSettings,
    };
    use http_body_util::BodyExt;
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn setup() -> (Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let state = AppState {
            api_keys: Arc::new(ApiKeyStore::from_entries(vec![
                ApiKeyEntry {
                    key: "key-ana".to_string(),
                    user_id: "ana".to_string(),
                },
                ApiKeyEntry {
                    key: "key-bia".to_string(),
                    user_id: "bia".to_string(),
                },
            ])),
            documents: Arc::new(DocumentStore::new(temp_dir.path())),
        };
        (app(state), temp_dir)
    }

    fn get_request(uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn put_request(uri: &str, key: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", key))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_requires_no_auth() {
        let (app, _temp) = setup();
        let response = app.oneshot(get_request("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_and_invalid_keys_are_rejected() {
        let (app, _temp) = setup();

        let response = app
            .clone()
            .oneshot(get_request("/v1/diet-states/ana", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "missing_auth");

        let response = app
            .oneshot(get_request("/v1/diet-states/ana", Some("nope")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "invalid_key");
    }

    #[tokio::test]
    async fn test_unknown_user_document_is_not_found() {
        let (app, _temp) = setup();
        let response = app
            .oneshot(get_request("/v1/diet-states/ana", Some("key-ana")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_then_get_returns_server_timestamp() {
        let (app, _temp) = setup();
        let state = json!({"hydrationGoal": 2500});

        let response = app
            .clone()
            .oneshot(put_request(
                "/v1/diet-states/ana",
                "key-ana",
                json!({ "state": state }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stored = body_json(response).await;
        assert!(stored["updatedAt"].is_string());

        let response = app
            .oneshot(get_request("/v1/diet-states/ana", Some("key-ana")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["state"], state);
        assert_eq!(fetched["updatedAt"], stored["updatedAt"]);
    }

    #[tokio::test]
    async fn test_other_users_document_is_forbidden() {
        let (app, _temp) = setup();
        let response = app
            .clone()
            .oneshot(get_request("/v1/diet-states/ana", Some("key-bia")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(put_request(
                "/v1/diet-states/ana",
                "key-bia",
                json!({"state": {}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_non_object_state_is_rejected() {
        let (app, _temp) = setup();
        let response = app
            .oneshot(put_request(
                "/v1/diet-states/ana",
                "key-ana",
                json!({"state": [1, 2, 3]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_engine_first_sync_over_http() {
        let (app, _temp) = setup();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let clock = ManualClock::new(1_000);
        let session = DietSession::load(MemoryStore::new(), Arc::new(clock.clone()));
        let remote = HttpRemote::new(format!("http://{}", addr), "key-ana");
        let engine = SyncEngine::new(session, remote.clone(), SyncSettings::default());

        assert_eq!(engine.login("ana").await, LoginOutcome::Initialized);

        use dietsync_core::RemoteStore;
        let document = remote.fetch("ana").await.unwrap().unwrap();
        assert_eq!(DietState::from_value(document.state), engine.snapshot());
        assert!(!engine.metadata().has_unsynced_changes());
    }
}
