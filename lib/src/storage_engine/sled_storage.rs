// lib/src/storage_engine/sled_storage.rs

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use sled::{CompareAndSwapError, Db, Transactional, Tree};
use tracing::{debug, info, warn};
use uuid::Uuid;

use models::errors::{ClinicError, ClinicResult};
use models::{Appointment, AppointmentStatus, PatientAccount, Prescription, SlotKey, StaffMember};

use crate::storage_engine::storage_engine::{stale_update, ClinicStorageEngine, SlotIndexReport};
use crate::storage_engine::storage_utils::{
    deserialize_record, serialize_record, sort_newest_first, SlotChanges,
};

const APPOINTMENTS_TREE: &str = "appointments";
const PRESCRIPTIONS_TREE: &str = "prescriptions";
const SLOT_RESERVATIONS_TREE: &str = "slot_reservations";
const STAFF_TREE: &str = "staff";
const PATIENTS_TREE: &str = "patients";

/// Opens (or creates) the sled database under `path`.
pub fn open_sled_db(path: &Path) -> ClinicResult<Db> {
    std::fs::create_dir_all(path)?;
    info!("Opening sled database at {:?}", path);
    sled::Config::new().path(path).open().map_err(|e| {
        ClinicError::StorageError(format!("Failed to open sled database at {:?}: {}", path, e))
    })
}

/// Sled-backed clinic store.
///
/// The `slot_reservations` tree maps `date \0 time` to the id of the
/// appointment holding that slot. Reservations are taken with
/// `compare_and_swap` against an empty entry, so two bookings racing for the
/// same slot cannot both succeed.
pub struct SledClinicStorage {
    db: Db,
    appointments: Tree,
    prescriptions: Tree,
    slot_reservations: Tree,
    staff: Tree,
    patients: Tree,
}

impl SledClinicStorage {
    pub fn new(db: Db) -> ClinicResult<Self> {
        Ok(Self {
            appointments: db.open_tree(APPOINTMENTS_TREE)?,
            prescriptions: db.open_tree(PRESCRIPTIONS_TREE)?,
            slot_reservations: db.open_tree(SLOT_RESERVATIONS_TREE)?,
            staff: db.open_tree(STAFF_TREE)?,
            patients: db.open_tree(PATIENTS_TREE)?,
            db,
        })
    }

    pub fn open(path: &Path) -> ClinicResult<Self> {
        Self::new(open_sled_db(path)?)
    }

    /// Claims `slot` for `owner` outside a transaction. Used by the index
    /// rebuild only.
    fn reserve(&self, slot: &SlotKey, owner: &Uuid) -> ClinicResult<()> {
        let cas = self.slot_reservations.compare_and_swap(
            slot.to_bytes(),
            None::<&[u8]>,
            Some(owner.as_bytes().to_vec()),
        )?;
        match cas {
            Ok(()) => {
                debug!("Reserved slot {} for appointment {}", slot, owner);
                Ok(())
            }
            Err(CompareAndSwapError { current: Some(holder), .. }) if holder[..] == owner.as_bytes()[..] => Ok(()),
            Err(_) => Err(ClinicError::SlotUnavailable { date: slot.date.clone(), time: slot.time.clone() }),
        }
    }

    fn load_appointments(&self) -> ClinicResult<Vec<Appointment>> {
        self.appointments
            .iter()
            .values()
            .map(|value| deserialize_record::<Appointment>(&value?))
            .collect()
    }
}

type TxResult<T> = Result<T, ConflictableTransactionError<ClinicError>>;

fn abort<T>(err: ClinicError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(err))
}

/// Takes `slot` for `owner` inside a transaction; a slot the owner already
/// holds is left as is.
fn claim_slot(reservations: &TransactionalTree, slot: &SlotKey, owner: &Uuid) -> TxResult<()> {
    let key = slot.to_bytes();
    match reservations.get(&key)? {
        Some(holder) if holder[..] != owner.as_bytes()[..] => {
            abort(ClinicError::SlotUnavailable { date: slot.date.clone(), time: slot.time.clone() })
        }
        Some(_) => Ok(()),
        None => {
            reservations.insert(key, &owner.as_bytes()[..])?;
            debug!("Reserved slot {} for appointment {}", slot, owner);
            Ok(())
        }
    }
}

fn run_transaction<T>(result: Result<T, TransactionError<ClinicError>>) -> ClinicResult<T> {
    result.map_err(|e| match e {
        TransactionError::Abort(err) => err,
        TransactionError::Storage(err) => err.into(),
    })
}

#[async_trait]
impl ClinicStorageEngine for SledClinicStorage {
    fn get_type(&self) -> &'static str {
        "sled"
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> ClinicResult<()> {
        let changes = SlotChanges::between(None, appointment);
        let record = serialize_record(appointment)?;
        let owner = appointment.id;
        run_transaction((&self.appointments, &self.slot_reservations).transaction(
            |(appointments, reservations)| {
                if appointments.get(owner.as_bytes())?.is_some() {
                    return abort(ClinicError::AlreadyExists(format!("Appointment {}", owner)));
                }
                if let Some(slot) = &changes.reserve {
                    claim_slot(reservations, slot, &owner)?;
                }
                appointments.insert(&owner.as_bytes()[..], record.clone())?;
                Ok(())
            },
        ))
    }

    async fn get_appointment(&self, id: &Uuid) -> ClinicResult<Option<Appointment>> {
        self.appointments
            .get(id.as_bytes())?
            .map(|bytes| deserialize_record(&bytes))
            .transpose()
    }

    async fn update_appointment(&self, previous: &Appointment, next: &Appointment) -> ClinicResult<()> {
        let changes = SlotChanges::between(Some(previous), next);
        let expected = serialize_record(previous)?;
        let record = serialize_record(next)?;
        let owner = previous.id;
        run_transaction((&self.appointments, &self.slot_reservations).transaction(
            |(appointments, reservations)| {
                if appointments.get(owner.as_bytes())?.as_deref() != Some(&expected[..]) {
                    return abort(stale_update(&owner));
                }
                if let Some(slot) = &changes.reserve {
                    claim_slot(reservations, slot, &owner)?;
                }
                appointments.insert(&owner.as_bytes()[..], record.clone())?;
                if let Some(slot) = &changes.release {
                    let key = slot.to_bytes();
                    if reservations.get(&key)?.as_deref() == Some(&owner.as_bytes()[..]) {
                        reservations.remove(key)?;
                    } else {
                        warn!("Slot {} was not held by appointment {}; leaving it untouched", slot, owner);
                    }
                }
                Ok(())
            },
        ))
    }

    async fn list_appointments(&self, status: Option<AppointmentStatus>) -> ClinicResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .load_appointments()?
            .into_iter()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .collect();
        sort_newest_first(&mut appointments);
        Ok(appointments)
    }

    async fn held_slots(&self, date: &str) -> ClinicResult<Vec<String>> {
        self.slot_reservations
            .scan_prefix(SlotKey::date_prefix(date))
            .keys()
            .map(|key| Ok(SlotKey::from_bytes(&key?)?.time))
            .collect()
    }

    async fn rebuild_slot_index(&self) -> ClinicResult<SlotIndexReport> {
        let mut appointments = self.load_appointments()?;
        appointments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        self.slot_reservations.clear()?;
        let mut report = SlotIndexReport { appointments_scanned: appointments.len(), ..Default::default() };
        let mut losers: HashMap<SlotKey, Vec<Uuid>> = HashMap::new();
        for appointment in &appointments {
            let Some(slot) = appointment.held_slot() else { continue };
            match self.reserve(&slot, &appointment.id) {
                Ok(()) => report.reservations += 1,
                Err(ClinicError::SlotUnavailable { .. }) => {
                    losers.entry(slot).or_default().push(appointment.id);
                }
                Err(e) => return Err(e),
            }
        }
        report.conflicts = losers.into_iter().collect();
        report.conflicts.sort_by(|a, b| a.0.to_bytes().cmp(&b.0.to_bytes()));
        info!(
            "Rebuilt slot index: {} reservations from {} appointments, {} conflicting slots",
            report.reservations,
            report.appointments_scanned,
            report.conflicts.len()
        );
        Ok(report)
    }

    async fn insert_prescription(&self, prescription: &Prescription) -> ClinicResult<()> {
        let bytes = serialize_record(prescription)?;
        self.prescriptions.insert(prescription.id.as_bytes(), bytes)?;
        Ok(())
    }

    async fn remove_prescription(&self, id: &Uuid) -> ClinicResult<()> {
        self.prescriptions.remove(id.as_bytes())?;
        Ok(())
    }

    async fn get_prescription(&self, id: &Uuid) -> ClinicResult<Option<Prescription>> {
        self.prescriptions
            .get(id.as_bytes())?
            .map(|bytes| deserialize_record(&bytes))
            .transpose()
    }

    async fn list_prescriptions(&self) -> ClinicResult<Vec<Prescription>> {
        self.prescriptions
            .iter()
            .values()
            .map(|value| deserialize_record::<Prescription>(&value?))
            .collect()
    }

    async fn put_staff(&self, staff: &StaffMember) -> ClinicResult<()> {
        let bytes = serialize_record(staff)?;
        self.staff.insert(staff.staff_id.as_bytes(), bytes)?;
        Ok(())
    }

    async fn get_staff(&self, staff_id: &str) -> ClinicResult<Option<StaffMember>> {
        self.staff
            .get(staff_id.as_bytes())?
            .map(|bytes| deserialize_record(&bytes))
            .transpose()
    }

    async fn insert_patient_account(&self, account: &PatientAccount) -> ClinicResult<()> {
        let bytes = serialize_record(account)?;
        let cas = self
            .patients
            .compare_and_swap(account.email.as_bytes(), None::<&[u8]>, Some(bytes))?;
        cas.map_err(|_| ClinicError::AlreadyExists(format!("An account for {} already exists", account.email)))
    }

    async fn get_patient_account(&self, email: &str) -> ClinicResult<Option<PatientAccount>> {
        self.patients
            .get(email.trim().to_lowercase().as_bytes())?
            .map(|bytes| deserialize_record(&bytes))
            .transpose()
    }

    async fn flush(&self) -> ClinicResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::NewAppointment;

    fn temporary_storage() -> SledClinicStorage {
        let db = sled::Config::new().temporary(true).open().unwrap();
        SledClinicStorage::new(db).unwrap()
    }

    fn booking(name: &str, time: &str) -> Appointment {
        Appointment::from_booking(NewAppointment {
            patient_name: Some(name.into()),
            patient_email: Some(format!("{}@example.com", name.to_lowercase())),
            patient_phone: Some("9876543210".into()),
            service: Some("dental-fillings".into()),
            doctor: Some("dr-michael-smith".into()),
            date: Some("2025-03-10".into()),
            time: Some(time.into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn second_booking_of_a_slot_is_refused() -> ClinicResult<()> {
        let storage = temporary_storage();
        let first = booking("Asha", "9:00 AM");
        storage.insert_appointment(&first).await?;

        let second = booking("Ravi", "9:00 AM");
        let err = storage.insert_appointment(&second).await.unwrap_err();
        assert!(matches!(err, ClinicError::SlotUnavailable { .. }));
        assert!(storage.get_appointment(&second.id).await?.is_none());
        assert_eq!(storage.held_slots("2025-03-10").await?, vec!["9:00 AM".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn cancelling_frees_the_slot() -> ClinicResult<()> {
        let storage = temporary_storage();
        let first = booking("Asha", "9:00 AM");
        storage.insert_appointment(&first).await?;

        let mut cancelled = first.clone();
        cancelled.status = AppointmentStatus::Cancelled;
        storage.update_appointment(&first, &cancelled).await?;
        assert!(storage.held_slots("2025-03-10").await?.is_empty());

        storage.insert_appointment(&booking("Ravi", "9:00 AM")).await?;
        assert_eq!(storage.list_appointments(None).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn rescheduling_into_a_held_slot_fails_and_keeps_the_old_one() -> ClinicResult<()> {
        let storage = temporary_storage();
        let asha = booking("Asha", "9:00 AM");
        let ravi = booking("Ravi", "9:30 AM");
        storage.insert_appointment(&asha).await?;
        storage.insert_appointment(&ravi).await?;

        let mut moved = ravi.clone();
        moved.time = "9:00 AM".into();
        assert!(storage.update_appointment(&ravi, &moved).await.is_err());
        let stored = storage.get_appointment(&ravi.id).await?.unwrap();
        assert_eq!(stored.time, "9:30 AM");

        let mut held = storage.held_slots("2025-03-10").await?;
        held.sort();
        assert_eq!(held, vec!["9:00 AM".to_string(), "9:30 AM".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn stale_accept_after_cancel_is_rejected() -> ClinicResult<()> {
        let storage = temporary_storage();
        let pending = booking("Asha", "9:00 AM");
        storage.insert_appointment(&pending).await?;
        let stale = storage.get_appointment(&pending.id).await?.unwrap();

        let mut cancelled = pending.clone();
        cancelled.status = AppointmentStatus::Cancelled;
        storage.update_appointment(&pending, &cancelled).await?;

        let mut confirmed = stale.clone();
        confirmed.status = AppointmentStatus::Confirmed;
        assert!(matches!(
            storage.update_appointment(&stale, &confirmed).await,
            Err(ClinicError::Conflict(_))
        ));
        let mut moved = stale.clone();
        moved.time = "10:00 AM".into();
        assert!(matches!(storage.update_appointment(&stale, &moved).await, Err(ClinicError::Conflict(_))));

        assert_eq!(storage.get_appointment(&pending.id).await?.unwrap().status, AppointmentStatus::Cancelled);
        assert!(storage.held_slots("2025-03-10").await?.is_empty());

        storage.insert_appointment(&booking("Ravi", "9:00 AM")).await?;
        let active = storage
            .list_appointments(None)
            .await?
            .into_iter()
            .filter(|a| a.held_slot().is_some())
            .count();
        assert_eq!(active, 1);
        Ok(())
    }

    #[tokio::test]
    async fn completed_appointment_no_longer_holds_its_slot() -> ClinicResult<()> {
        let storage = temporary_storage();
        let asha = booking("Asha", "9:00 AM");
        storage.insert_appointment(&asha).await?;
        let mut done = asha.clone();
        done.status = AppointmentStatus::Completed;
        storage.update_appointment(&asha, &done).await?;

        let completed = storage.list_appointments(Some(AppointmentStatus::Completed)).await?;
        assert_eq!(completed.len(), 1);
        assert!(storage.held_slots("2025-03-10").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn rebuild_reports_conflicts_and_keeps_earliest() -> ClinicResult<()> {
        let storage = temporary_storage();
        let asha = booking("Asha", "9:00 AM");
        storage.insert_appointment(&asha).await?;
        // Simulates a legacy record written without a reservation.
        let mut ravi = booking("Ravi", "9:00 AM");
        ravi.created_at = asha.created_at + chrono::Duration::seconds(5);
        storage.appointments.insert(ravi.id.as_bytes(), serialize_record(&ravi)?)?;

        let report = storage.rebuild_slot_index().await?;
        assert_eq!(report.appointments_scanned, 2);
        assert_eq!(report.reservations, 1);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].1, vec![ravi.id]);
        Ok(())
    }

    #[tokio::test]
    async fn patient_emails_are_unique() -> ClinicResult<()> {
        let storage = temporary_storage();
        let account = PatientAccount::from_registration(
            models::NewPatientAccount {
                name: Some("Ravi".into()),
                email: Some("ravi@mail.com".into()),
                password: Some("pw".into()),
                phone: None,
            },
            4,
        )?;
        storage.insert_patient_account(&account).await?;
        assert!(matches!(
            storage.insert_patient_account(&account).await,
            Err(ClinicError::AlreadyExists(_))
        ));
        assert!(storage.get_patient_account("RAVI@mail.com").await?.is_some());
        Ok(())
    }
}
