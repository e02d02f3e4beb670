// rest_api/src/handlers/system.rs

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::AppState;

pub async fn banner() -> Json<Value> {
    Json(json!({
        "message": "DentoCare+ Backend API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "Running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "storage": state.services.storage.get_type(),
    }))
}

pub async fn route_not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "success": false, "message": "Route not found" })))
}
