// rest_api/src/errors.rs
// Maps core and auth failures onto `{success:false, message}` responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use models::errors::ClinicError;
use security::AuthError;

const SLOT_TAKEN_MESSAGE: &str = "This time slot is no longer available. Please select another time.";
const SERVER_ERROR_MESSAGE: &str = "Server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Clinic(#[from] ClinicError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Invalid request body: {0}")]
    Body(#[from] JsonRejection),
    #[error("Invalid query string: {0}")]
    Query(#[from] QueryRejection),
}

pub type ApiResult<T> = Result<T, ApiError>;

fn envelope(message: impl Into<String>) -> Value {
    json!({ "success": false, "message": message.into() })
}

fn clinic_failure(err: ClinicError) -> (StatusCode, Value) {
    match err {
        ClinicError::Validation(mut messages) => {
            if messages.len() == 1 {
                (StatusCode::BAD_REQUEST, envelope(messages.remove(0)))
            } else {
                let mut body = envelope("Validation error");
                body["errors"] = json!(messages);
                (StatusCode::BAD_REQUEST, body)
            }
        }
        ClinicError::NotFound(what) => (StatusCode::NOT_FOUND, envelope(format!("{} not found", what))),
        ClinicError::SlotUnavailable { date, time } => {
            warn!("Booking rejected, slot {} {} is held", date, time);
            (StatusCode::BAD_REQUEST, envelope(SLOT_TAKEN_MESSAGE))
        }
        err @ ClinicError::InvalidTransition { .. } => (StatusCode::CONFLICT, envelope(err.to_string())),
        ClinicError::Conflict(message) => {
            warn!("Rejected stale update: {}", message);
            (StatusCode::CONFLICT, envelope(message))
        }
        ClinicError::AlreadyExists(message) => (StatusCode::BAD_REQUEST, envelope(message)),
        ClinicError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, envelope(message)),
        other => {
            error!("Request failed: {}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, envelope(SERVER_ERROR_MESSAGE))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Clinic(err) => clinic_failure(err),
            ApiError::Auth(err) => match err {
                AuthError::MissingToken | AuthError::InvalidToken(_) => {
                    (StatusCode::UNAUTHORIZED, envelope(err.to_string()))
                }
                AuthError::Forbidden(_) => (StatusCode::FORBIDDEN, envelope(err.to_string())),
                AuthError::JwtError(_) => {
                    error!("Token handling failed: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, envelope(SERVER_ERROR_MESSAGE))
                }
            },
            ApiError::Body(rejection) => (rejection.status(), envelope(rejection.body_text())),
            ApiError::Query(rejection) => (rejection.status(), envelope(rejection.body_text())),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::AppointmentStatus;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn client_faults_map_to_their_status() {
        assert_eq!(status_of(ClinicError::invalid("Date parameter is required").into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ClinicError::NotFound("Appointment".into()).into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ClinicError::SlotUnavailable { date: "2025-03-10".into(), time: "9:00 AM".into() }.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                ClinicError::InvalidTransition { from: AppointmentStatus::Completed, to: AppointmentStatus::Cancelled }
                    .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ClinicError::Conflict("Appointment was changed by another request".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(AuthError::MissingToken.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::Forbidden(security::Role::Patient).into()), StatusCode::FORBIDDEN);
    }

    #[test]
    fn dependency_failures_hide_detail() {
        let (status, body) = clinic_failure(ClinicError::StorageError("tree `appointments` is corrupt".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], SERVER_ERROR_MESSAGE);
    }

    #[test]
    fn multiple_validation_messages_are_listed() {
        let (_, body) = clinic_failure(ClinicError::Validation(vec![
            "Patient name is required".into(),
            "Appointment time is required".into(),
        ]));
        assert_eq!(body["message"], "Validation error");
        assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["success"], false);
    }
}
