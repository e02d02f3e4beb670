// rest_api/src/handlers/prescriptions.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{json, Value};

use lib::GeneratePrescriptionRequest;

use super::AppointmentView;
use crate::errors::ApiResult;
use crate::{AppState, StaffSession};

pub async fn generate(
    _staff: StaffSession,
    State(state): State<AppState>,
    payload: Result<Json<GeneratePrescriptionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let generated = state.services.prescriptions.generate(request).await?;
    let message = if generated.email_sent {
        "Prescription generated, saved, and emailed successfully"
    } else {
        "Prescription generated and saved; the email could not be sent"
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "prescriptionId": generated.prescription.id,
        "emailSent": generated.email_sent,
        "pdfPath": generated.prescription.pdf_path,
        "appointment": AppointmentView::from(&generated.appointment),
    })))
}

pub async fn for_appointment(
    _staff: StaffSession,
    State(state): State<AppState>,
    Path(appointment_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let prescriptions = state.services.prescriptions.for_appointment(&appointment_id).await?;
    Ok(Json(json!({ "success": true, "prescriptions": prescriptions })))
}

pub async fn for_patient(
    _staff: StaffSession,
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let prescriptions = state.services.prescriptions.for_patient(&patient_id).await?;
    Ok(Json(json!({ "success": true, "prescriptions": prescriptions })))
}
