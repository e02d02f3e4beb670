// rest_api/src/handlers/mod.rs

pub mod accounts;
pub mod appointments;
pub mod dashboard;
pub mod prescriptions;
pub mod system;
pub mod visits;

use serde::Serialize;
use uuid::Uuid;

use lib::prescriptions::parse_required_id;
use models::errors::ClinicResult;
use models::Appointment;

/// Appointment as sent to clients: the stored record plus the derived
/// `isCompleted` flag.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView<'a> {
    #[serde(flatten)]
    pub appointment: &'a Appointment,
    pub is_completed: bool,
}

impl<'a> From<&'a Appointment> for AppointmentView<'a> {
    fn from(appointment: &'a Appointment) -> Self {
        Self { appointment, is_completed: appointment.is_completed() }
    }
}

pub fn appointment_views(appointments: &[Appointment]) -> Vec<AppointmentView<'_>> {
    appointments.iter().map(AppointmentView::from).collect()
}

pub fn appointment_id(raw: &str) -> ClinicResult<Uuid> {
    parse_required_id(Some(raw), "Appointment ID is required")
}
