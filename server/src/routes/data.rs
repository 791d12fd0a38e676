//! Data endpoints: the four transport calls as JSON over HTTP.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::AppState;
use kvdoc_engine::protocol::{
    BucketInfo, KeyedRequest, KeyedResponse, ObserveRequest, ObserveResponse, OpenBucketRequest,
    SubdocRequest, SubdocResponse,
};
use kvdoc_engine::subdoc::MAX_SPECS;
use kvdoc_engine::Transport;

/// Create data routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pools/{bucket}/auth", post(auth_handler))
        .route("/kv", post(keyed_handler))
        .route("/subdoc", post(subdoc_handler))
        .route("/observe", post(observe_handler))
}

/// Credentials for `POST /pools/{bucket}/auth`.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /pools/{bucket}/auth - Open a bucket.
async fn auth_handler(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<BucketInfo>> {
    let info = state.cluster.open_bucket(&OpenBucketRequest {
        bucket,
        username: credentials.username,
        password: credentials.password,
    })?;
    Ok(Json(info))
}

/// POST /kv - Execute a single-document command.
async fn keyed_handler(
    State(state): State<AppState>,
    Json(request): Json<KeyedRequest>,
) -> Result<Json<KeyedResponse>> {
    if request.target.key.is_empty() {
        return Err(AppError::BadRequest("document key is empty".into()));
    }
    Ok(Json(state.cluster.send_keyed(request)?))
}

/// POST /subdoc - Execute a lookupIn or mutateIn.
async fn subdoc_handler(
    State(state): State<AppState>,
    Json(request): Json<SubdocRequest>,
) -> Result<Json<SubdocResponse>> {
    if request.specs.is_empty() {
        return Err(AppError::BadRequest("no specs".into()));
    }
    if request.specs.len() > MAX_SPECS {
        return Err(AppError::BadRequest(format!(
            "at most {MAX_SPECS} specs per request, got {}",
            request.specs.len()
        )));
    }
    Ok(Json(state.cluster.send_subdoc(request)?))
}

/// POST /observe - Report partition sequence numbers on every copy.
async fn observe_handler(
    State(state): State<AppState>,
    Json(request): Json<ObserveRequest>,
) -> Result<Json<ObserveResponse>> {
    Ok(Json(state.cluster.observe_seqno(&request)?))
}
