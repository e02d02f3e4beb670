// lib/src/appointments/lifecycle.rs
// Pure status transitions. Each function takes the stored record and returns
// the record to write; persistence and side effects are the caller's job.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use models::errors::{ClinicError, ClinicResult};
use models::{Appointment, AppointmentStatus};

/// Name recorded when the accepting staff member is not given.
pub const DEFAULT_ACCEPTOR: &str = "Staff Member";

/// Named operations and the statuses they may start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Accept,
    Complete,
    LinkPrescription,
    Cancel,
}

impl Transition {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            Transition::Accept => AppointmentStatus::Confirmed,
            Transition::Complete | Transition::LinkPrescription => AppointmentStatus::Completed,
            Transition::Cancel => AppointmentStatus::Cancelled,
        }
    }

    pub fn allowed_from(&self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            Transition::Accept => &[Pending],
            Transition::Complete => &[Confirmed],
            Transition::LinkPrescription => &[Pending, Confirmed],
            Transition::Cancel => &[Pending, Confirmed],
        }
    }

    /// # Errors
    /// `ClinicError::InvalidTransition` when `current` is not a legal start.
    pub fn check(&self, current: AppointmentStatus) -> ClinicResult<()> {
        let to = self.target();
        if self.allowed_from().contains(&current) && current.can_transition_to(to) {
            debug!("Transition {:?} validated: {} -> {}", self, current, to);
            return Ok(());
        }
        warn!("Invalid status transition attempted: {} -> {} ({:?})", current, to, self);
        Err(ClinicError::InvalidTransition { from: current, to })
    }
}

/// Validates a status change requested through the generic update.
pub fn validate_status_change(from: AppointmentStatus, to: AppointmentStatus) -> ClinicResult<()> {
    if from == to || from.can_transition_to(to) {
        Ok(())
    } else {
        warn!("Generic update tried to move appointment from {} to {}", from, to);
        Err(ClinicError::InvalidTransition { from, to })
    }
}

/// `pending -> confirmed`. Booking notes are carried over untouched.
pub fn accept(current: &Appointment, accepted_by: Option<&str>, now: DateTime<Utc>) -> ClinicResult<Appointment> {
    Transition::Accept.check(current.status)?;
    let mut next = current.clone();
    next.status = AppointmentStatus::Confirmed;
    next.accepted_by = Some(
        accepted_by
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ACCEPTOR)
            .to_string(),
    );
    next.accepted_at = Some(now);
    next.updated_at = now;
    Ok(next)
}

/// `confirmed -> completed` with the visit outcome.
pub fn complete(
    current: &Appointment,
    treatment_notes: Option<&str>,
    amount_charged: Option<f64>,
    now: DateTime<Utc>,
) -> ClinicResult<Appointment> {
    Transition::Complete.check(current.status)?;
    let amount = amount_charged.unwrap_or(0.0);
    if !amount.is_finite() || amount < 0.0 {
        return Err(ClinicError::invalid("Amount charged must be a non-negative number"));
    }
    let mut next = current.clone();
    next.status = AppointmentStatus::Completed;
    next.completed_at = Some(now);
    next.treatment_notes = treatment_notes.map(|n| n.trim().to_string()).unwrap_or_default();
    next.amount_charged = amount;
    next.updated_at = now;
    Ok(next)
}

/// `pending|confirmed -> completed`, recording the prescription.
pub fn link_prescription(current: &Appointment, prescription_id: Uuid, now: DateTime<Utc>) -> ClinicResult<Appointment> {
    Transition::LinkPrescription.check(current.status)?;
    let mut next = current.clone();
    next.status = AppointmentStatus::Completed;
    next.prescription_id = Some(prescription_id);
    next.completed_at = Some(now);
    next.updated_at = now;
    Ok(next)
}

/// Soft delete. Returns `None` when the appointment is already cancelled.
pub fn cancel(current: &Appointment, now: DateTime<Utc>) -> ClinicResult<Option<Appointment>> {
    if current.status == AppointmentStatus::Cancelled {
        return Ok(None);
    }
    Transition::Cancel.check(current.status)?;
    let mut next = current.clone();
    next.status = AppointmentStatus::Cancelled;
    next.updated_at = now;
    Ok(Some(next))
}

/// Generic partial update: schema-validated merge plus a transition check on
/// any status change. `completedAt` is stamped when the update completes it.
pub fn apply_patch(current: &Appointment, patch: &Map<String, Value>, now: DateTime<Utc>) -> ClinicResult<Appointment> {
    let mut next = current.merged_with(patch)?;
    validate_status_change(current.status, next.status)?;
    if next.status == AppointmentStatus::Completed && current.status != AppointmentStatus::Completed {
        next.completed_at.get_or_insert(now);
    }
    next.updated_at = now;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::NewAppointment;
    use serde_json::json;

    fn pending() -> Appointment {
        Appointment::from_booking(NewAppointment {
            patient_name: Some("Asha".into()),
            patient_email: Some("asha@example.com".into()),
            patient_phone: Some("98765".into()),
            service: Some("root-canal".into()),
            doctor: Some("dr-michael-smith".into()),
            date: Some("2025-03-10".into()),
            time: Some("9:00 AM".into()),
            notes: Some("Sensitive upper molar".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn accept_stamps_acceptor_and_keeps_notes() {
        let now = Utc::now();
        let confirmed = accept(&pending(), None, now).unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        assert_eq!(confirmed.accepted_by.as_deref(), Some(DEFAULT_ACCEPTOR));
        assert_eq!(confirmed.accepted_at, Some(now));
        assert_eq!(confirmed.notes, "Sensitive upper molar");
        assert!(!confirmed.is_completed());

        let named = accept(&pending(), Some("Dr. Smith"), now).unwrap();
        assert_eq!(named.accepted_by.as_deref(), Some("Dr. Smith"));
    }

    #[test]
    fn accept_twice_is_rejected() {
        let confirmed = accept(&pending(), None, Utc::now()).unwrap();
        let err = accept(&confirmed, None, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            ClinicError::InvalidTransition { from: AppointmentStatus::Confirmed, to: AppointmentStatus::Confirmed }
        ));
    }

    #[test]
    fn complete_needs_confirmation_and_records_outcome() {
        let now = Utc::now();
        assert!(complete(&pending(), Some("filling"), Some(1500.0), now).is_err());

        let confirmed = accept(&pending(), None, now).unwrap();
        let done = complete(&confirmed, Some("filling"), Some(1500.0), now).unwrap();
        assert!(done.is_completed());
        assert_eq!(done.treatment_notes, "filling");
        assert_eq!(done.amount_charged, 1500.0);
        assert_eq!(done.completed_at, Some(now));

        assert!(complete(&confirmed, None, Some(-1.0), now).is_err());
        let defaults = complete(&confirmed, None, None, now).unwrap();
        assert_eq!(defaults.amount_charged, 0.0);
        assert_eq!(defaults.treatment_notes, "");
    }

    #[test]
    fn link_prescription_completes_from_pending() {
        let rx = Uuid::new_v4();
        let done = link_prescription(&pending(), rx, Utc::now()).unwrap();
        assert!(done.is_completed());
        assert_eq!(done.prescription_id, Some(rx));
        assert!(link_prescription(&done, rx, Utc::now()).is_err());
    }

    #[test]
    fn cancel_is_idempotent_but_not_after_completion() {
        let now = Utc::now();
        let cancelled = cancel(&pending(), now).unwrap().unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(cancelled.notes, "Sensitive upper molar");
        assert!(cancel(&cancelled, now).unwrap().is_none());

        let done = link_prescription(&pending(), Uuid::new_v4(), now).unwrap();
        assert!(matches!(cancel(&done, now), Err(ClinicError::InvalidTransition { .. })));
    }

    #[test]
    fn patch_checks_the_transition_table() {
        let now = Utc::now();
        let done = link_prescription(&pending(), Uuid::new_v4(), now).unwrap();
        let reopen = json!({ "status": "pending" });
        assert!(matches!(
            apply_patch(&done, reopen.as_object().unwrap(), now),
            Err(ClinicError::InvalidTransition { .. })
        ));

        let confirm = json!({ "status": "confirmed", "notes": "bring x-rays" });
        let confirmed = apply_patch(&pending(), confirm.as_object().unwrap(), now).unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        assert_eq!(confirmed.notes, "bring x-rays");

        let finish = json!({ "status": "completed" });
        let finished = apply_patch(&confirmed, finish.as_object().unwrap(), now).unwrap();
        assert_eq!(finished.completed_at, Some(now));
    }
}
