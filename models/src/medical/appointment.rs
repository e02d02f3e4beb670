// models/src/medical/appointment.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::{ClinicError, ClinicResult};
use crate::identifiers::SlotKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses that keep the (date, time) slot occupied.
    pub fn holds_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// The legal transition table. Staying in the same status is not a
    /// transition and is not covered here.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(ClinicError::invalid(format!(
                "`{}` is not a valid appointment status",
                other
            ))),
        }
    }
}

// --- DTO for a patient booking ---
// Every field is optional on the wire so that absent fields surface as
// validation messages rather than a body-parsing rejection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAppointment {
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_id: Option<String>,
    pub service: Option<String>,
    pub doctor: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    #[serde(default)]
    pub patient_id: Option<String>,
    pub service: String,
    pub doctor: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub notes: String,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub accepted_by: Option<String>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub treatment_notes: String,
    #[serde(default)]
    pub amount_charged: f64,
    #[serde(default)]
    pub consultation_fee: f64,
    #[serde(default)]
    pub prescription_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a generic update may never touch.
const IMMUTABLE_FIELDS: [&str; 2] = ["id", "createdAt"];
/// Derived on output, silently dropped on input.
const DERIVED_FIELDS: [&str; 2] = ["isCompleted", "_id"];

fn required(value: Option<String>, message: &str, problems: &mut Vec<String>) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            problems.push(message.to_string());
            String::new()
        }
    }
}

impl Appointment {
    /// Builds a `pending` appointment from a booking request, trimming every
    /// field and lower-casing the email.
    ///
    /// # Errors
    /// `ClinicError::Validation` listing one message per missing field.
    pub fn from_booking(booking: NewAppointment) -> ClinicResult<Self> {
        let mut problems = Vec::new();
        let patient_name = required(booking.patient_name, "Patient name is required", &mut problems);
        let patient_email = required(booking.patient_email, "Patient email is required", &mut problems)
            .to_lowercase();
        let patient_phone = required(booking.patient_phone, "Patient phone is required", &mut problems);
        let service = required(booking.service, "Service is required", &mut problems);
        let doctor = required(booking.doctor, "Doctor selection is required", &mut problems);
        let date = required(booking.date, "Appointment date is required", &mut problems);
        let time = required(booking.time, "Appointment time is required", &mut problems);
        if !problems.is_empty() {
            return Err(ClinicError::Validation(problems));
        }

        let now = Utc::now();
        Ok(Appointment {
            id: Uuid::new_v4(),
            patient_name,
            patient_email,
            patient_phone,
            patient_id: booking
                .patient_id
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            service,
            doctor,
            date,
            time,
            notes: booking.notes.map(|n| n.trim().to_string()).unwrap_or_default(),
            status: AppointmentStatus::Pending,
            accepted_by: None,
            accepted_at: None,
            completed_at: None,
            treatment_notes: String::new(),
            amount_charged: 0.0,
            consultation_fee: 0.0,
            prescription_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_completed(&self) -> bool {
        self.status == AppointmentStatus::Completed
    }

    pub fn slot_key(&self) -> ClinicResult<SlotKey> {
        SlotKey::new(self.date.clone(), self.time.clone())
    }

    /// The slot this appointment currently occupies, if any.
    pub fn held_slot(&self) -> Option<SlotKey> {
        if self.status.holds_slot() {
            self.slot_key().ok()
        } else {
            None
        }
    }

    /// Re-checks the schema-level constraints on a stored record.
    pub fn validate(&self) -> ClinicResult<()> {
        let checks = [
            (&self.patient_name, "Patient name is required"),
            (&self.patient_email, "Patient email is required"),
            (&self.patient_phone, "Patient phone is required"),
            (&self.service, "Service is required"),
            (&self.doctor, "Doctor selection is required"),
            (&self.date, "Appointment date is required"),
            (&self.time, "Appointment time is required"),
        ];
        let problems: Vec<String> = checks
            .iter()
            .filter(|(value, _)| value.trim().is_empty())
            .map(|(_, message)| message.to_string())
            .collect();
        if !problems.is_empty() {
            return Err(ClinicError::Validation(problems));
        }
        if self.amount_charged < 0.0 || self.consultation_fee < 0.0 {
            return Err(ClinicError::invalid("Amounts cannot be negative"));
        }
        Ok(())
    }

    /// Merges a camelCase field map into a copy of this record and re-reads it
    /// through the schema. Status legality is the caller's concern.
    pub fn merged_with(&self, patch: &Map<String, Value>) -> ClinicResult<Appointment> {
        let immutable: Vec<String> = IMMUTABLE_FIELDS
            .iter()
            .filter(|field| patch.contains_key(**field))
            .map(|field| format!("`{}` cannot be changed", field))
            .collect();
        if !immutable.is_empty() {
            return Err(ClinicError::Validation(immutable));
        }

        let mut problems = Vec::new();
        let mut current = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => return Err(ClinicError::InternalError("appointment did not serialize to an object".to_string())),
        };
        for (field, value) in patch {
            if DERIVED_FIELDS.contains(&field.as_str()) {
                continue;
            }
            if !current.contains_key(field) {
                problems.push(format!("Unknown field `{}`", field));
                continue;
            }
            current.insert(field.clone(), value.clone());
        }
        if !problems.is_empty() {
            return Err(ClinicError::Validation(problems));
        }

        let mut merged: Appointment = serde_json::from_value(Value::Object(current))
            .map_err(|e| ClinicError::invalid(e.to_string()))?;
        merged.patient_email = merged.patient_email.trim().to_lowercase();
        merged.validate()?;
        Ok(merged)
    }
}
