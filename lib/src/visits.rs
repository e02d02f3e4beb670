// lib/src/visits.rs
// Patient history rows, derived on request from completed appointments and
// their prescriptions.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use models::errors::ClinicResult;
use models::{Appointment, AppointmentStatus, PatientVisit, Prescription};

use crate::dashboard::parse_appointment_date;
use crate::storage_engine::ClinicStorageEngine;

fn visit_amount(appointment: &Appointment, prescription: Option<&Prescription>) -> f64 {
    match prescription.map(|p| p.invoice_data.billed_amount()) {
        Some(amount) if amount != 0.0 => amount,
        _ => appointment.amount_charged,
    }
}

/// Newest appointment date first; unparseable dates sort last.
fn by_date_desc(a: &Appointment, b: &Appointment) -> Ordering {
    match (parse_appointment_date(&a.date), parse_appointment_date(&b.date)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.date.cmp(&a.date),
    }
}

pub fn project_visits(appointments: &[Appointment], prescriptions: &[Prescription]) -> Vec<PatientVisit> {
    let mut by_id: HashMap<Uuid, &Prescription> = HashMap::new();
    let mut by_appointment: HashMap<Uuid, &Prescription> = HashMap::new();
    for prescription in prescriptions {
        by_id.insert(prescription.id, prescription);
        let newer = by_appointment
            .get(&prescription.appointment_id)
            .map_or(true, |seen| seen.created_at < prescription.created_at);
        if newer {
            by_appointment.insert(prescription.appointment_id, prescription);
        }
    }

    let mut completed: Vec<&Appointment> =
        appointments.iter().filter(|a| a.status == AppointmentStatus::Completed).collect();
    completed.sort_by(|a, b| by_date_desc(a, b));

    completed
        .into_iter()
        .map(|appointment| {
            let prescription = appointment
                .prescription_id
                .and_then(|id| by_id.get(&id).copied())
                .or_else(|| by_appointment.get(&appointment.id).copied());
            PatientVisit {
                appointment_id: appointment.id,
                patient_name: appointment.patient_name.clone(),
                patient_email: appointment.patient_email.clone(),
                patient_phone: appointment.patient_phone.clone(),
                service: appointment.service.clone(),
                date: appointment.date.clone(),
                time: appointment.time.clone(),
                doctor: appointment.doctor.clone(),
                treatment_notes: appointment.treatment_notes.clone(),
                prescription_id: prescription.map(|p| p.id).or(appointment.prescription_id),
                amount_charged: visit_amount(appointment, prescription),
                completed_at: appointment.completed_at,
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct PatientVisitService {
    storage: Arc<dyn ClinicStorageEngine>,
}

impl PatientVisitService {
    pub fn new(storage: Arc<dyn ClinicStorageEngine>) -> Self {
        Self { storage }
    }

    pub async fn list(&self) -> ClinicResult<Vec<PatientVisit>> {
        let appointments = self.storage.list_appointments(Some(AppointmentStatus::Completed)).await?;
        let prescriptions = self.storage.list_prescriptions().await?;
        Ok(project_visits(&appointments, &prescriptions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use models::{InvoiceData, NewAppointment, PrescriptionData, PrescriptionStatus};

    fn completed(date: &str, amount_charged: f64) -> Appointment {
        let mut a = Appointment::from_booking(NewAppointment {
            patient_name: Some("Asha".into()),
            patient_email: Some("asha@example.com".into()),
            patient_phone: Some("1".into()),
            service: Some("dental-fillings".into()),
            doctor: Some("dr-michael-smith".into()),
            date: Some(date.into()),
            time: Some("9:00 AM".into()),
            ..Default::default()
        })
        .unwrap();
        a.status = AppointmentStatus::Completed;
        a.amount_charged = amount_charged;
        a
    }

    #[test]
    fn invoice_amount_wins_over_recorded_charge() {
        let mut with_rx = completed("2025-03-10", 1500.0);
        let rx = Prescription {
            id: Uuid::new_v4(),
            appointment_id: with_rx.id,
            patient_id: None,
            doctor_id: "d".into(),
            prescription_data: PrescriptionData::default(),
            invoice_data: InvoiceData { total_amount: Some(1800.0), ..Default::default() },
            pdf_path: String::new(),
            status: PrescriptionStatus::Sent,
            created_at: Utc::now(),
        };
        with_rx.prescription_id = Some(rx.id);
        let plain = completed("2025-03-11", 1500.0);
        let mut pending = completed("2025-03-12", 0.0);
        pending.status = AppointmentStatus::Pending;

        let visits = project_visits(&[with_rx.clone(), plain.clone(), pending], &[rx.clone()]);
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].appointment_id, plain.id);
        assert_eq!(visits[0].amount_charged, 1500.0);
        assert_eq!(visits[1].appointment_id, with_rx.id);
        assert_eq!(visits[1].amount_charged, 1800.0);
        assert_eq!(visits[1].prescription_id, Some(rx.id));
    }
}
