// lib/src/appointments/service.rs

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use models::errors::{ClinicError, ClinicResult};
use models::{Appointment, AppointmentStatus, NewAppointment};
use notifications_service::{messages, send_best_effort, Mailer};

use crate::appointments::lifecycle;
use crate::scheduling::{SlotAvailability, SlotCatalog};
use crate::storage_engine::ClinicStorageEngine;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AcceptRequest {
    pub accepted_by: Option<String>,
    /// Shown in the confirmation email only.
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompleteRequest {
    pub treatment_notes: Option<String>,
    pub amount_charged: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcceptOutcome {
    pub appointment: Appointment,
    pub email_sent: bool,
}

/// Booking, lookup and the named lifecycle operations.
#[derive(Clone)]
pub struct AppointmentService {
    storage: Arc<dyn ClinicStorageEngine>,
    catalog: SlotCatalog,
    mailer: Arc<dyn Mailer>,
    clinic_name: String,
}

impl AppointmentService {
    pub fn new(
        storage: Arc<dyn ClinicStorageEngine>,
        catalog: SlotCatalog,
        mailer: Arc<dyn Mailer>,
        clinic_name: impl Into<String>,
    ) -> Self {
        Self { storage, catalog, mailer, clinic_name: clinic_name.into() }
    }

    pub fn catalog(&self) -> &SlotCatalog {
        &self.catalog
    }

    pub async fn list(&self, status: Option<AppointmentStatus>) -> ClinicResult<Vec<Appointment>> {
        self.storage.list_appointments(status).await
    }

    /// Catalog labels not held by a pending or confirmed appointment on `date`.
    pub async fn available_slots(&self, date: &str) -> ClinicResult<SlotAvailability> {
        let date = date.trim();
        if date.is_empty() {
            return Err(ClinicError::invalid("Date parameter is required"));
        }
        let held = self.storage.held_slots(date).await?;
        Ok(self.catalog.availability(date, &held))
    }

    /// Creates a `pending` appointment. The slot reservation and the insert
    /// are one storage operation.
    pub async fn book(&self, booking: NewAppointment) -> ClinicResult<Appointment> {
        let appointment = Appointment::from_booking(booking)?;
        self.storage.insert_appointment(&appointment).await?;
        info!(
            "Booked appointment {} for {} at {} {}",
            appointment.id, appointment.patient_email, appointment.date, appointment.time
        );
        Ok(appointment)
    }

    pub async fn get(&self, id: &Uuid) -> ClinicResult<Appointment> {
        self.storage
            .get_appointment(id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Appointment".to_string()))
    }

    /// Confirms the booking, then emails the patient. The email outcome is
    /// reported, never raised.
    pub async fn accept(&self, id: &Uuid, request: AcceptRequest) -> ClinicResult<AcceptOutcome> {
        let current = self.get(id).await?;
        let next = lifecycle::accept(&current, request.accepted_by.as_deref(), Utc::now())?;
        self.storage.update_appointment(&current, &next).await?;
        info!("Appointment {} accepted by {:?}", id, next.accepted_by);

        let message = messages::appointment_confirmation(
            &self.clinic_name,
            &next,
            request.notes.as_deref().unwrap_or_default(),
        );
        let email_sent = send_best_effort(self.mailer.as_ref(), &message).await;
        if !email_sent {
            warn!("Confirmation email for appointment {} was not delivered", id);
        }
        Ok(AcceptOutcome { appointment: next, email_sent })
    }

    pub async fn complete(&self, id: &Uuid, request: CompleteRequest) -> ClinicResult<Appointment> {
        let current = self.get(id).await?;
        let next = lifecycle::complete(
            &current,
            request.treatment_notes.as_deref(),
            request.amount_charged,
            Utc::now(),
        )?;
        self.storage.update_appointment(&current, &next).await?;
        info!("Appointment {} completed (charged {})", id, next.amount_charged);
        Ok(next)
    }

    pub async fn link_prescription(&self, id: &Uuid, prescription_id: Uuid) -> ClinicResult<Appointment> {
        let current = self.get(id).await?;
        let next = lifecycle::link_prescription(&current, prescription_id, Utc::now())?;
        self.storage.update_appointment(&current, &next).await?;
        info!("Prescription {} linked to appointment {}", prescription_id, id);
        Ok(next)
    }

    /// Soft delete; cancelling twice returns the stored record unchanged.
    pub async fn cancel(&self, id: &Uuid) -> ClinicResult<Appointment> {
        let current = self.get(id).await?;
        match lifecycle::cancel(&current, Utc::now())? {
            Some(next) => {
                self.storage.update_appointment(&current, &next).await?;
                info!("Appointment {} cancelled", id);
                Ok(next)
            }
            None => Ok(current),
        }
    }

    /// Generic field update, validated against the schema and the transition
    /// table. Date, time or status changes move the slot reservation.
    pub async fn update(&self, id: &Uuid, patch: &Value) -> ClinicResult<Appointment> {
        let fields: &Map<String, Value> = patch
            .as_object()
            .ok_or_else(|| ClinicError::invalid("Update body must be a JSON object"))?;
        let current = self.get(id).await?;
        let next = lifecycle::apply_patch(&current, fields, Utc::now())?;
        self.storage.update_appointment(&current, &next).await?;
        info!("Appointment {} updated ({} fields)", id, fields.len());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::InMemoryClinicStorage;
    use notifications_service::testing::RecordingMailer;
    use serde_json::json;

    fn service_with(mailer: Arc<RecordingMailer>) -> AppointmentService {
        AppointmentService::new(
            Arc::new(InMemoryClinicStorage::new()),
            SlotCatalog::default(),
            mailer,
            "DentoCare+",
        )
    }

    fn booking(time: &str) -> NewAppointment {
        NewAppointment {
            patient_name: Some("Asha Rao".into()),
            patient_email: Some("asha@example.com".into()),
            patient_phone: Some("9876543210".into()),
            service: Some("dental-fillings".into()),
            doctor: Some("dr-michael-smith".into()),
            date: Some("2025-03-10".into()),
            time: Some(time.into()),
            notes: Some("Upper left molar".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn booking_removes_slot_and_cancel_restores_it() -> ClinicResult<()> {
        let service = service_with(Arc::new(RecordingMailer::new()));
        let booked = service.book(booking("9:00 AM")).await?;
        let slots = service.available_slots("2025-03-10").await?;
        assert!(!slots.available_slots.contains(&"9:00 AM".to_string()));
        assert_eq!(slots.booked_slots, 1);

        service.cancel(&booked.id).await?;
        let slots = service.available_slots("2025-03-10").await?;
        assert!(slots.available_slots.contains(&"9:00 AM".to_string()));
        assert_eq!(slots.available_slots.len(), 20);
        Ok(())
    }

    #[tokio::test]
    async fn second_booking_waits_for_cancellation() -> ClinicResult<()> {
        let service = service_with(Arc::new(RecordingMailer::new()));
        let first = service.book(booking("9:00 AM")).await?;
        assert!(matches!(
            service.book(booking("9:00 AM")).await,
            Err(ClinicError::SlotUnavailable { .. })
        ));
        service.cancel(&first.id).await?;
        service.book(booking("9:00 AM")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn invalid_booking_creates_nothing() -> ClinicResult<()> {
        let service = service_with(Arc::new(RecordingMailer::new()));
        let mut request = booking("9:00 AM");
        request.doctor = Some(String::new());
        assert!(matches!(service.book(request).await, Err(ClinicError::Validation(_))));
        assert!(service.list(None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn accept_emails_confirmation_notes_without_storing_them() -> ClinicResult<()> {
        let mailer = Arc::new(RecordingMailer::new());
        let service = service_with(mailer.clone());
        let booked = service.book(booking("9:00 AM")).await?;

        let outcome = service
            .accept(&booked.id, AcceptRequest { accepted_by: None, notes: Some("Arrive 10 minutes early".into()) })
            .await?;
        assert!(outcome.email_sent);
        assert_eq!(outcome.appointment.status, AppointmentStatus::Confirmed);
        assert_eq!(outcome.appointment.notes, "Upper left molar");

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "asha@example.com");
        assert!(sent[0].html.contains("Arrive 10 minutes early"));
        Ok(())
    }

    #[tokio::test]
    async fn accept_survives_mail_outage() -> ClinicResult<()> {
        let service = service_with(Arc::new(RecordingMailer::failing()));
        let booked = service.book(booking("9:00 AM")).await?;
        let outcome = service.accept(&booked.id, AcceptRequest::default()).await?;
        assert!(!outcome.email_sent);
        assert_eq!(service.get(&booked.id).await?.status, AppointmentStatus::Confirmed);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let service = service_with(Arc::new(RecordingMailer::new()));
        let id = Uuid::new_v4();
        assert!(matches!(service.get(&id).await, Err(ClinicError::NotFound(_))));
        assert!(matches!(service.cancel(&id).await, Err(ClinicError::NotFound(_))));
        assert!(matches!(
            service.accept(&id, AcceptRequest::default()).await,
            Err(ClinicError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn patch_can_reschedule_into_a_free_slot_only() -> ClinicResult<()> {
        let service = service_with(Arc::new(RecordingMailer::new()));
        let asha = service.book(booking("9:00 AM")).await?;
        let mut other = booking("9:30 AM");
        other.patient_email = Some("ravi@example.com".into());
        service.book(other).await?;

        assert!(matches!(
            service.update(&asha.id, &json!({ "time": "9:30 AM" })).await,
            Err(ClinicError::SlotUnavailable { .. })
        ));
        let moved = service.update(&asha.id, &json!({ "time": "10:00 AM" })).await?;
        assert_eq!(moved.time, "10:00 AM");

        let slots = service.available_slots("2025-03-10").await?;
        assert!(slots.available_slots.contains(&"9:00 AM".to_string()));
        assert!(!slots.available_slots.contains(&"10:00 AM".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn patch_rejects_non_objects_and_bad_status() -> ClinicResult<()> {
        let service = service_with(Arc::new(RecordingMailer::new()));
        let booked = service.book(booking("9:00 AM")).await?;
        assert!(service.update(&booked.id, &json!(["status"])).await.is_err());
        assert!(matches!(
            service.update(&booked.id, &json!({ "status": "archived" })).await,
            Err(ClinicError::Validation(_))
        ));
        Ok(())
    }
}
