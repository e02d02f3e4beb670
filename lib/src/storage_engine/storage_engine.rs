// lib/src/storage_engine/storage_engine.rs

use async_trait::async_trait;
use uuid::Uuid;

use models::errors::{ClinicError, ClinicResult};
use models::{Appointment, AppointmentStatus, PatientAccount, Prescription, SlotKey, StaffMember};

/// Outcome of recomputing slot reservations from the stored appointments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotIndexReport {
    pub appointments_scanned: usize,
    pub reservations: usize,
    /// Slots claimed by more than one active appointment. The earliest
    /// booking keeps the reservation; the rest are listed here.
    pub conflicts: Vec<(SlotKey, Vec<Uuid>)>,
}

/// Error for an update whose `previous` no longer matches the stored record.
pub fn stale_update(id: &Uuid) -> ClinicError {
    ClinicError::Conflict(format!("Appointment {} was changed by another request; reload and retry", id))
}

/// Document store behind the clinic service.
///
/// Slot uniqueness lives here: an appointment whose status holds a slot
/// (`pending`/`confirmed`) owns the reservation for its (date, time) and no
/// other appointment can be written into that slot while it does.
#[async_trait]
pub trait ClinicStorageEngine: Send + Sync + 'static {
    fn get_type(&self) -> &'static str;

    /// Conditionally inserts a new appointment.
    ///
    /// # Errors
    /// `ClinicError::SlotUnavailable` when another appointment holds the slot.
    async fn insert_appointment(&self, appointment: &Appointment) -> ClinicResult<()>;

    async fn get_appointment(&self, id: &Uuid) -> ClinicResult<Option<Appointment>>;

    /// Replaces `previous` with `next`, moving or releasing the slot
    /// reservation as their statuses and (date, time) dictate. The record
    /// check, reservation change and write are one atomic step.
    ///
    /// # Errors
    /// `ClinicError::Conflict` when the stored record is no longer `previous`;
    /// nothing is written in that case.
    async fn update_appointment(&self, previous: &Appointment, next: &Appointment) -> ClinicResult<()>;

    /// All appointments, optionally of one status, newest booking first.
    async fn list_appointments(&self, status: Option<AppointmentStatus>) -> ClinicResult<Vec<Appointment>>;

    /// Slot labels currently reserved on `date`.
    async fn held_slots(&self, date: &str) -> ClinicResult<Vec<String>>;

    async fn rebuild_slot_index(&self) -> ClinicResult<SlotIndexReport>;

    async fn insert_prescription(&self, prescription: &Prescription) -> ClinicResult<()>;

    async fn get_prescription(&self, id: &Uuid) -> ClinicResult<Option<Prescription>>;

    /// Deletes a prescription that never got linked to its appointment.
    async fn remove_prescription(&self, id: &Uuid) -> ClinicResult<()>;

    async fn list_prescriptions(&self) -> ClinicResult<Vec<Prescription>>;

    /// Prescriptions of one appointment, newest first.
    async fn prescriptions_for_appointment(&self, appointment_id: &Uuid) -> ClinicResult<Vec<Prescription>> {
        let mut found: Vec<Prescription> = self
            .list_prescriptions()
            .await?
            .into_iter()
            .filter(|p| p.appointment_id == *appointment_id)
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn prescriptions_for_patient(&self, patient_id: &str) -> ClinicResult<Vec<Prescription>> {
        Ok(self
            .list_prescriptions()
            .await?
            .into_iter()
            .filter(|p| p.patient_id.as_deref() == Some(patient_id))
            .collect())
    }

    /// Creates or replaces a staff member, keyed by staff id.
    async fn put_staff(&self, staff: &StaffMember) -> ClinicResult<()>;

    async fn get_staff(&self, staff_id: &str) -> ClinicResult<Option<StaffMember>>;

    /// # Errors
    /// `ClinicError::AlreadyExists` when the email is already registered.
    async fn insert_patient_account(&self, account: &PatientAccount) -> ClinicResult<()>;

    async fn get_patient_account(&self, email: &str) -> ClinicResult<Option<PatientAccount>>;

    async fn flush(&self) -> ClinicResult<()>;
}
