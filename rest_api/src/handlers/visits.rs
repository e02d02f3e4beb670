// rest_api/src/handlers/visits.rs

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::errors::ApiResult;
use crate::{AppState, StaffSession};

/// Completed appointments as patient visits, newest date first.
pub async fn list(_staff: StaffSession, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let visits = state.services.visits.list().await?;
    Ok(Json(json!({
        "success": true,
        "count": visits.len(),
        "visits": visits,
    })))
}
