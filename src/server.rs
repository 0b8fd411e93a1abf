//!
//! inkpress HTTP server
//! --------------------
//! This module defines the Axum-based HTTP API over the identity resolver and
//! upload coordinator.
//!
//! Responsibilities:
//! - Auth endpoints: /signup, /signin, /google-auth, all returning the shared
//!   AuthSession shape or a JSON error.
//! - Media endpoints: /get-upload-url issuance, PUT /files/{name} chunked
//!   ingestion, GET /files/{name} chunked serving.
//! - Error mapping: every recoverable auth failure is 403, object misses are
//!   404, backend failures are 500; no failure path leaves a request hanging.
//! - Permissive CORS for the browser front-end.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::federated::GoogleVerifier;
use crate::identity::{AuthSession, FileIdentityStore, IdentityResolver};
use crate::objectstore::ObjectStore;
use crate::token::TokenIssuer;
use crate::upload::UploadCoordinator;

/// Shared server state injected into all handlers: the fully constructed
/// dependency bundle, no ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<IdentityResolver>,
    pub uploads: Arc<UploadCoordinator>,
}

pub fn build_state(cfg: &Config) -> anyhow::Result<AppState> {
    std::fs::create_dir_all(&cfg.data_root)?;
    let identity_store = Arc::new(FileIdentityStore::new(cfg.data_root.join("identity"))?);
    let object_store = Arc::new(ObjectStore::new(cfg.data_root.join("media"))?);
    let verifier = Arc::new(GoogleVerifier::from_pem_keys(
        cfg.federated_issuer.clone(),
        cfg.federated_audience.clone(),
        &cfg.load_federated_keys()?,
    )?);
    let tokens = TokenIssuer::new(cfg.token_secret.as_bytes());
    let resolver = Arc::new(IdentityResolver::new(identity_store, verifier, tokens));
    let uploads = Arc::new(UploadCoordinator::new(object_store, cfg.public_base_url.clone()));
    Ok(AppState { resolver, uploads })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "inkpress ok" }))
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/google-auth", post(google_auth))
        .route("/get-upload-url", get(get_upload_url))
        .route("/files/{name}", put(put_file).get(get_file))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the inkpress HTTP server with the given configuration.
pub async fn run_with_config(cfg: Config) -> anyhow::Result<()> {
    let state = build_state(&cfg)?;
    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SignupPayload { fullname: String, email: String, password: String }

#[derive(Debug, Deserialize)]
struct SigninPayload { email: String, password: String }

#[derive(Debug, Deserialize)]
struct GoogleAuthPayload { access_token: String }

#[derive(Debug, Deserialize)]
struct UploadUrlQuery {
    /// Content type of the upcoming upload, e.g. `?type=image/png`.
    #[serde(rename = "type")]
    content_type: Option<String>,
}

/// Auth surface contract: 200 with the session, 403 for every recoverable
/// failure, 500 otherwise.
fn auth_response(result: AppResult<AuthSession>) -> Response {
    match result {
        Ok(session) => (StatusCode::OK, Json(json!(session))).into_response(),
        Err(e) if e.is_recoverable() => {
            (StatusCode::FORBIDDEN, Json(json!({"error": e.message()}))).into_response()
        }
        Err(e) => {
            error!("auth request failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "Internal Server Error"}))).into_response()
        }
    }
}

/// File surface contract: statuses follow the error taxonomy (403 invalid
/// name, 404 missing object, 500 backend).
fn file_error_response(e: AppError) -> Response {
    if !e.is_recoverable() {
        error!("file request failed: {}", e);
    }
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"error": e.message()}))).into_response()
}

async fn signup(State(state): State<AppState>, Json(payload): Json<SignupPayload>) -> Response {
    auth_response(state.resolver.signup(&payload.fullname, &payload.email, &payload.password).await)
}

async fn signin(State(state): State<AppState>, Json(payload): Json<SigninPayload>) -> Response {
    auth_response(state.resolver.password_signin(&payload.email, &payload.password).await)
}

async fn google_auth(State(state): State<AppState>, Json(payload): Json<GoogleAuthPayload>) -> Response {
    auth_response(state.resolver.federated_signin(&payload.access_token).await)
}

async fn get_upload_url(State(state): State<AppState>, Query(q): Query<UploadUrlQuery>) -> Response {
    match state.uploads.issue_upload_target(q.content_type.as_deref()) {
        Ok(target) => (StatusCode::OK, Json(json!({"uploadURL": target.upload_url}))).into_response(),
        Err(e) => file_error_response(e),
    }
}

async fn put_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    match state.uploads.receive(&name, &content_type, body).await {
        Ok(meta) => (
            StatusCode::OK,
            Json(json!({"name": meta.name, "size": meta.size, "content_type": meta.content_type})),
        ).into_response(),
        Err(e) => file_error_response(e),
    }
}

async fn get_file(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.uploads.serve(&name).await {
        Ok(resp) => resp,
        Err(e) => file_error_response(e),
    }
}
