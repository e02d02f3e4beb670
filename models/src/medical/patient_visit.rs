// models/src/medical/patient_visit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read model for the patient history list. Never stored; always derived from
/// a completed appointment and its linked prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientVisit {
    #[serde(rename = "id")]
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    pub service: String,
    pub date: String,
    pub time: String,
    pub doctor: String,
    pub treatment_notes: String,
    pub prescription_id: Option<Uuid>,
    pub amount_charged: f64,
    pub completed_at: Option<DateTime<Utc>>,
}
