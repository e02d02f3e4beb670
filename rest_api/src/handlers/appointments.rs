// rest_api/src/handlers/appointments.rs

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use lib::{AcceptRequest, CompleteRequest};
use models::errors::ClinicError;
use models::{AppointmentStatus, NewAppointment};

use super::{appointment_id, appointment_views, AppointmentView};
use crate::errors::ApiResult;
use crate::{AppState, StaffSession};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkPrescriptionBody {
    pub prescription_id: Option<String>,
}

pub async fn list(
    _staff: StaffSession,
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<AppointmentStatus>()?),
        None => None,
    };
    let appointments = state.services.appointments.list(status).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointments retrieved successfully",
        "count": appointments.len(),
        "appointments": appointment_views(&appointments),
    })))
}

pub async fn available_slots(
    State(state): State<AppState>,
    query: Result<Query<SlotsQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let availability = state
        .services
        .appointments
        .available_slots(query.date.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Available slots retrieved successfully",
        "date": availability.date,
        "totalSlots": availability.total_slots,
        "bookedSlots": availability.booked_slots,
        "availableSlots": availability.available_slots,
    })))
}

pub async fn book(
    State(state): State<AppState>,
    payload: Result<Json<NewAppointment>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(booking) = payload?;
    let appointment = state.services.appointments.book(booking).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Appointment booked successfully. You will receive a confirmation email shortly.",
            "appointment": AppointmentView::from(&appointment),
        })),
    ))
}

pub async fn fetch(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let appointment = state.services.appointments.get(&appointment_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointment retrieved successfully",
        "appointment": AppointmentView::from(&appointment),
    })))
}

pub async fn accept(
    _staff: StaffSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Option<Json<AcceptRequest>>,
) -> ApiResult<Json<Value>> {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let outcome = state.services.appointments.accept(&appointment_id(&id)?, request).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointment accepted successfully",
        "emailSent": outcome.email_sent,
        "appointment": AppointmentView::from(&outcome.appointment),
    })))
}

pub async fn complete(
    _staff: StaffSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Option<Json<CompleteRequest>>,
) -> ApiResult<Json<Value>> {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let appointment = state.services.appointments.complete(&appointment_id(&id)?, request).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointment completed successfully",
        "appointment": AppointmentView::from(&appointment),
    })))
}

pub async fn link_prescription(
    _staff: StaffSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<LinkPrescriptionBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let id = appointment_id(&id)?;
    let raw = body
        .prescription_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ClinicError::invalid("Prescription ID is required"))?;
    let prescription_id =
        Uuid::parse_str(raw).map_err(|_| ClinicError::invalid(format!("`{}` is not a valid prescription ID", raw)))?;
    let appointment = state.services.appointments.link_prescription(&id, prescription_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Prescription linked and appointment completed successfully",
        "appointment": AppointmentView::from(&appointment),
    })))
}

pub async fn update(
    _staff: StaffSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(patch) = payload?;
    let appointment = state.services.appointments.update(&appointment_id(&id)?, &patch).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointment updated successfully",
        "appointment": AppointmentView::from(&appointment),
    })))
}

pub async fn cancel(
    _staff: StaffSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let appointment = state.services.appointments.cancel(&appointment_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully",
        "appointment": AppointmentView::from(&appointment),
    })))
}
