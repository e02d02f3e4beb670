// rest_api/src/handlers/dashboard.rs

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::errors::ApiResult;
use crate::{AppState, StaffSession};

pub async fn revenue_stats(_staff: StaffSession, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = state.services.dashboard.revenue().await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn visit_stats(_staff: StaffSession, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = state.services.dashboard.visits().await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn patient_stats(_staff: StaffSession, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = state.services.dashboard.patients().await?;
    Ok(Json(json!({ "success": true, "data": data })))
}
