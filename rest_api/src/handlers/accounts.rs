// rest_api/src/handlers/accounts.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use models::{NewPatientAccount, PatientLogin, StaffLogin};
use security::Role;

use crate::errors::ApiResult;
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewPatientAccount>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(request) = payload?;
    let account = state.services.accounts.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account created successfully! Please login.",
            "user": {
                "id": account.id,
                "name": account.name,
                "email": account.email,
                "userType": Role::Patient.as_str(),
            },
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<PatientLogin>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let account = state.services.accounts.login(request).await?;
    let token = state.tokens.issue(&account.email, &account.name, Role::Patient)?;
    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "user": {
            "id": account.id,
            "name": account.name,
            "email": account.email,
            "userType": Role::Patient.as_str(),
        },
    })))
}

pub async fn staff_login(
    State(state): State<AppState>,
    payload: Result<Json<StaffLogin>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let staff = state.services.accounts.staff_login(request).await?;
    let token = state.tokens.issue(&staff.staff_id, &staff.name, Role::Staff)?;
    Ok(Json(json!({
        "success": true,
        "message": "Staff login successful",
        "token": token,
        "user": {
            "id": staff.id,
            "staffId": staff.staff_id,
            "name": staff.name,
            "userType": Role::Staff.as_str(),
        },
    })))
}
