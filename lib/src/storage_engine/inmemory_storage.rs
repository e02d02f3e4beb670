// lib/src/storage_engine/inmemory_storage.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use models::errors::{ClinicError, ClinicResult};
use models::{Appointment, AppointmentStatus, PatientAccount, Prescription, SlotKey, StaffMember};

use super::storage_engine::{stale_update, ClinicStorageEngine, SlotIndexReport};
use super::storage_utils::{sort_newest_first, SlotChanges};

#[derive(Debug, Default)]
struct MemoryState {
    appointments: HashMap<Uuid, Appointment>,
    prescriptions: HashMap<Uuid, Prescription>,
    reservations: HashMap<SlotKey, Uuid>,
    staff: HashMap<String, StaffMember>,
    patients: HashMap<String, PatientAccount>,
}

impl MemoryState {
    fn slot_free_for(&self, slot: &SlotKey, owner: &Uuid) -> bool {
        self.reservations.get(slot).map_or(true, |holder| holder == owner)
    }
}

/// Non-persistent store for tests and throwaway runs. One lock covers every
/// map, so the reservation check and the record write happen together.
#[derive(Debug, Default)]
pub struct InMemoryClinicStorage {
    state: RwLock<MemoryState>,
}

impl InMemoryClinicStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn slot_unavailable(slot: &SlotKey) -> ClinicError {
    ClinicError::SlotUnavailable { date: slot.date.clone(), time: slot.time.clone() }
}

#[async_trait]
impl ClinicStorageEngine for InMemoryClinicStorage {
    fn get_type(&self) -> &'static str {
        "inmemory"
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> ClinicResult<()> {
        let mut state = self.state.write().await;
        if let Some(slot) = SlotChanges::between(None, appointment).reserve {
            if !state.slot_free_for(&slot, &appointment.id) {
                return Err(slot_unavailable(&slot));
            }
            state.reservations.insert(slot, appointment.id);
        }
        state.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn get_appointment(&self, id: &Uuid) -> ClinicResult<Option<Appointment>> {
        Ok(self.state.read().await.appointments.get(id).cloned())
    }

    async fn update_appointment(&self, previous: &Appointment, next: &Appointment) -> ClinicResult<()> {
        let mut state = self.state.write().await;
        if state.appointments.get(&previous.id) != Some(previous) {
            return Err(stale_update(&previous.id));
        }
        let changes = SlotChanges::between(Some(previous), next);
        if let Some(slot) = changes.reserve {
            if !state.slot_free_for(&slot, &next.id) {
                return Err(slot_unavailable(&slot));
            }
            state.reservations.insert(slot, next.id);
        }
        if let Some(slot) = changes.release {
            if state.reservations.get(&slot) == Some(&previous.id) {
                state.reservations.remove(&slot);
            }
        }
        state.appointments.insert(next.id, next.clone());
        Ok(())
    }

    async fn list_appointments(&self, status: Option<AppointmentStatus>) -> ClinicResult<Vec<Appointment>> {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        sort_newest_first(&mut appointments);
        Ok(appointments)
    }

    async fn held_slots(&self, date: &str) -> ClinicResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .reservations
            .keys()
            .filter(|slot| slot.date == date)
            .map(|slot| slot.time.clone())
            .collect())
    }

    async fn rebuild_slot_index(&self) -> ClinicResult<SlotIndexReport> {
        let mut state = self.state.write().await;
        let mut appointments: Vec<&Appointment> = state.appointments.values().collect();
        appointments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut reservations: HashMap<SlotKey, Uuid> = HashMap::new();
        let mut losers: HashMap<SlotKey, Vec<Uuid>> = HashMap::new();
        for appointment in &appointments {
            let Some(slot) = appointment.held_slot() else { continue };
            if reservations.contains_key(&slot) {
                losers.entry(slot).or_default().push(appointment.id);
            } else {
                reservations.insert(slot, appointment.id);
            }
        }
        let mut conflicts: Vec<(SlotKey, Vec<Uuid>)> = losers.into_iter().collect();
        conflicts.sort_by(|a, b| a.0.to_bytes().cmp(&b.0.to_bytes()));
        let report = SlotIndexReport {
            appointments_scanned: appointments.len(),
            reservations: reservations.len(),
            conflicts,
        };
        state.reservations = reservations;
        Ok(report)
    }

    async fn insert_prescription(&self, prescription: &Prescription) -> ClinicResult<()> {
        self.state.write().await.prescriptions.insert(prescription.id, prescription.clone());
        Ok(())
    }

    async fn remove_prescription(&self, id: &Uuid) -> ClinicResult<()> {
        self.state.write().await.prescriptions.remove(id);
        Ok(())
    }

    async fn get_prescription(&self, id: &Uuid) -> ClinicResult<Option<Prescription>> {
        Ok(self.state.read().await.prescriptions.get(id).cloned())
    }

    async fn list_prescriptions(&self) -> ClinicResult<Vec<Prescription>> {
        Ok(self.state.read().await.prescriptions.values().cloned().collect())
    }

    async fn put_staff(&self, staff: &StaffMember) -> ClinicResult<()> {
        self.state.write().await.staff.insert(staff.staff_id.clone(), staff.clone());
        Ok(())
    }

    async fn get_staff(&self, staff_id: &str) -> ClinicResult<Option<StaffMember>> {
        Ok(self.state.read().await.staff.get(staff_id).cloned())
    }

    async fn insert_patient_account(&self, account: &PatientAccount) -> ClinicResult<()> {
        let mut state = self.state.write().await;
        if state.patients.contains_key(&account.email) {
            return Err(ClinicError::AlreadyExists(format!("An account for {} already exists", account.email)));
        }
        state.patients.insert(account.email.clone(), account.clone());
        Ok(())
    }

    async fn get_patient_account(&self, email: &str) -> ClinicResult<Option<PatientAccount>> {
        Ok(self.state.read().await.patients.get(&email.trim().to_lowercase()).cloned())
    }

    async fn flush(&self) -> ClinicResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use models::NewAppointment;

    fn booking(name: &str, time: &str) -> Appointment {
        Appointment::from_booking(NewAppointment {
            patient_name: Some(name.into()),
            patient_email: Some("p@example.com".into()),
            patient_phone: Some("1".into()),
            service: Some("teeth-cleaning".into()),
            doctor: Some("dr-sarah-johnson".into()),
            date: Some("2025-03-11".into()),
            time: Some(time.into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn concurrent_bookings_for_one_slot_admit_exactly_one() {
        let storage = Arc::new(InMemoryClinicStorage::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage.insert_appointment(&booking(&format!("P{}", i), "10:00 AM")).await
            }));
        }
        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(storage.list_appointments(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn accepting_keeps_the_slot_held() {
        let storage = InMemoryClinicStorage::new();
        let pending = booking("Asha", "10:00 AM");
        storage.insert_appointment(&pending).await.unwrap();
        let mut confirmed = pending.clone();
        confirmed.status = AppointmentStatus::Confirmed;
        storage.update_appointment(&pending, &confirmed).await.unwrap();

        assert_eq!(storage.held_slots("2025-03-11").await.unwrap(), vec!["10:00 AM".to_string()]);
        assert!(storage.insert_appointment(&booking("Ravi", "10:00 AM")).await.is_err());
    }

    #[tokio::test]
    async fn filtered_listing_is_newest_first() {
        let storage = InMemoryClinicStorage::new();
        let older = booking("Asha", "8:00 AM");
        let mut newer = booking("Ravi", "8:30 AM");
        newer.created_at = older.created_at + chrono::Duration::minutes(1);
        storage.insert_appointment(&older).await.unwrap();
        storage.insert_appointment(&newer).await.unwrap();

        let listed = storage.list_appointments(Some(AppointmentStatus::Pending)).await.unwrap();
        assert_eq!(listed.iter().map(|a| a.id).collect::<Vec<_>>(), vec![newer.id, older.id]);
        assert!(storage.list_appointments(Some(AppointmentStatus::Cancelled)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_from_a_stale_read_is_rejected() {
        let storage = InMemoryClinicStorage::new();
        let pending = booking("Asha", "10:00 AM");
        storage.insert_appointment(&pending).await.unwrap();
        let stale = storage.get_appointment(&pending.id).await.unwrap().unwrap();

        let mut cancelled = pending.clone();
        cancelled.status = AppointmentStatus::Cancelled;
        storage.update_appointment(&pending, &cancelled).await.unwrap();

        let mut confirmed = stale.clone();
        confirmed.status = AppointmentStatus::Confirmed;
        assert!(matches!(
            storage.update_appointment(&stale, &confirmed).await,
            Err(ClinicError::Conflict(_))
        ));
        let mut moved = stale.clone();
        moved.time = "11:00 AM".to_string();
        assert!(matches!(storage.update_appointment(&stale, &moved).await, Err(ClinicError::Conflict(_))));

        let stored = storage.get_appointment(&pending.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Cancelled);
        assert!(storage.held_slots("2025-03-11").await.unwrap().is_empty());

        storage.insert_appointment(&booking("Ravi", "10:00 AM")).await.unwrap();
        let active = storage
            .list_appointments(None)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.held_slot().is_some())
            .count();
        assert_eq!(active, 1);
    }
}
