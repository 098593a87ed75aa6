//! API Handlers
//!
//! HTTP request handlers for each cache endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::CacheEngine;
use crate::error::{CacheError, Result};
use crate::models::{
    AccessResponse, GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The engine synchronizes internally, so handlers share it through a plain `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache engine
    pub engine: Arc<CacheEngine>,
}

impl AppState {
    /// Creates a new AppState around the given engine.
    pub fn new(engine: CacheEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair; may trigger an eviction sweep.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.engine.set(&req.key, &req.value).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// A miss is a normal response with `found: false`.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state.engine.get(&key).await?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for GET /access/:key
///
/// Reports the key's access count without incrementing it.
pub async fn access_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<AccessResponse>> {
    let access_count = state.engine.access_count(&key).await?;

    Ok(Json(AccessResponse::new(key, access_count)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state.engine.stats().await?;

    Ok(Json(StatsResponse::from(stats)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
