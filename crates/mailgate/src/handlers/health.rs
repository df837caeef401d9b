//! Liveness endpoint.

use axum::response::Json;
use serde_json::{json, Value};

/// Health check endpoint for liveness/readiness probes.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "message": "ok" }))
}
