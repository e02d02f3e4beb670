// lib/src/prescriptions/service.rs

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use models::errors::{ClinicError, ClinicResult};
use models::{Appointment, InvoiceData, Prescription, PrescriptionData, PrescriptionStatus};
use notifications_service::{messages, send_best_effort, Mailer};

use crate::appointments::{lifecycle, Transition};
use crate::documents::{DocumentRenderer, PrescriptionArchive, PrescriptionDocument};
use crate::storage_engine::ClinicStorageEngine;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratePrescriptionRequest {
    pub appointment_id: Option<String>,
    pub doctor_id: Option<String>,
    pub patient_email: Option<String>,
    pub prescription_data: PrescriptionData,
    pub invoice_data: InvoiceData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPrescription {
    pub prescription: Prescription,
    pub appointment: Appointment,
    pub email_sent: bool,
}

/// Renders, archives and records a prescription, completes the appointment,
/// then emails the PDF. Everything before the email is the unit of work: if
/// the appointment cannot be completed the record and PDF are removed again.
/// The email outcome is only reported.
pub struct PrescriptionService {
    storage: Arc<dyn ClinicStorageEngine>,
    renderer: Arc<dyn DocumentRenderer>,
    archive: PrescriptionArchive,
    mailer: Arc<dyn Mailer>,
    clinic_name: String,
}

/// Patient identifier stored on the appointment, or a time-based stand-in.
pub fn derive_patient_id(appointment: &Appointment) -> String {
    appointment
        .patient_id
        .clone()
        .unwrap_or_else(|| format!("patient_{}", Utc::now().timestamp_millis()))
}

impl PrescriptionService {
    pub fn new(
        storage: Arc<dyn ClinicStorageEngine>,
        renderer: Arc<dyn DocumentRenderer>,
        archive: PrescriptionArchive,
        mailer: Arc<dyn Mailer>,
        clinic_name: impl Into<String>,
    ) -> Self {
        Self { storage, renderer, archive, mailer, clinic_name: clinic_name.into() }
    }

    pub async fn generate(&self, request: GeneratePrescriptionRequest) -> ClinicResult<GeneratedPrescription> {
        let appointment_id = parse_required_id(request.appointment_id.as_deref(), "Appointment ID is required")?;
        let doctor_id = request
            .doctor_id
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let appointment = self
            .storage
            .get_appointment(&appointment_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Appointment".to_string()))?;
        Transition::LinkPrescription.check(appointment.status)?;

        let doctor_id = doctor_id.unwrap_or_else(|| appointment.doctor.clone());
        let patient_id = derive_patient_id(&appointment);
        let invoice = request.invoice_data.with_computed_totals();
        let issued_at = Utc::now();

        let document = PrescriptionDocument {
            clinic_name: self.clinic_name.clone(),
            appointment_id,
            issued_at,
            patient_name: appointment.patient_name.clone(),
            doctor: doctor_id.clone(),
            prescription: request.prescription_data.clone(),
            invoice: invoice.clone(),
        };
        let renderer = self.renderer.clone();
        let pdf = tokio::task::spawn_blocking(move || renderer.render(&document)).await??;
        let pdf_path = self.archive.store(&appointment_id, issued_at, &pdf).await?;

        let prescription = Prescription {
            id: Uuid::new_v4(),
            appointment_id,
            patient_id: Some(patient_id),
            doctor_id,
            prescription_data: request.prescription_data,
            invoice_data: invoice,
            pdf_path: pdf_path.to_string_lossy().into_owned(),
            status: PrescriptionStatus::Sent,
            created_at: issued_at,
        };
        if let Err(e) = self.storage.insert_prescription(&prescription).await {
            self.archive.discard(&pdf_path).await;
            return Err(e);
        }

        let linked = match lifecycle::link_prescription(&appointment, prescription.id, Utc::now()) {
            Ok(completed) => self.storage.update_appointment(&appointment, &completed).await.map(|()| completed),
            Err(e) => Err(e),
        };
        let completed = match linked {
            Ok(completed) => completed,
            Err(e) => {
                error!(
                    "Appointment {} could not be completed, discarding prescription {}: {}",
                    appointment_id, prescription.id, e
                );
                if let Err(cleanup) = self.storage.remove_prescription(&prescription.id).await {
                    error!("Prescription {} left without an appointment link: {}", prescription.id, cleanup);
                }
                self.archive.discard(&pdf_path).await;
                return Err(e);
            }
        };
        info!("Prescription {} generated for appointment {}", prescription.id, appointment_id);

        let recipient = request
            .patient_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(&appointment.patient_email)
            .to_string();
        let message = messages::prescription_delivery(
            &self.clinic_name,
            &recipient,
            &appointment.patient_name,
            &prescription.prescription_data,
            &prescription.invoice_data,
            pdf,
        );
        let email_sent = send_best_effort(self.mailer.as_ref(), &message).await;
        if !email_sent {
            warn!("Prescription {} was saved but its email to {:?} was not delivered", prescription.id, recipient);
        }

        Ok(GeneratedPrescription { prescription, appointment: completed, email_sent })
    }

    pub async fn for_appointment(&self, appointment_id: &str) -> ClinicResult<Vec<Prescription>> {
        let id = parse_required_id(Some(appointment_id), "Appointment ID is required")?;
        self.storage.prescriptions_for_appointment(&id).await
    }

    pub async fn for_patient(&self, patient_id: &str) -> ClinicResult<Vec<Prescription>> {
        self.storage.prescriptions_for_patient(patient_id.trim()).await
    }
}

/// Parses a path or body id. A malformed id cannot name a stored record, so
/// it reads as not found.
pub fn parse_required_id(raw: Option<&str>, missing_message: &str) -> ClinicResult<Uuid> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty()).ok_or_else(|| ClinicError::invalid(missing_message))?;
    Uuid::parse_str(raw).map_err(|_| ClinicError::NotFound("Appointment".to_string()))
}
