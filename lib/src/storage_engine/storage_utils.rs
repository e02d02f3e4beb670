// lib/src/storage_engine/storage_utils.rs

use bincode::config;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{de::DeserializeOwned, Serialize};

use models::errors::{ClinicError, ClinicResult};
use models::{Appointment, SlotKey};

/// Helper to serialize a stored record to bytes using bincode.
pub fn serialize_record<T: Serialize>(record: &T) -> ClinicResult<Vec<u8>> {
    encode_to_vec(record, config::standard())
        .map_err(|e| ClinicError::SerializationError(e.to_string()))
}

/// Helper to deserialize bytes produced by [`serialize_record`].
pub fn deserialize_record<T: DeserializeOwned>(bytes: &[u8]) -> ClinicResult<T> {
    decode_from_slice(bytes, config::standard())
        .map(|(val, _)| val) // decode_from_slice returns (value, bytes_read)
        .map_err(|e| ClinicError::DeserializationError(e.to_string()))
}

/// Reservation work implied by replacing `previous` with `next`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotChanges {
    pub reserve: Option<SlotKey>,
    pub release: Option<SlotKey>,
}

impl SlotChanges {
    pub fn between(previous: Option<&Appointment>, next: &Appointment) -> Self {
        let before = previous.and_then(Appointment::held_slot);
        let after = next.held_slot();
        if before == after {
            return SlotChanges::default();
        }
        SlotChanges { reserve: after, release: before }
    }
}

pub fn sort_newest_first(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
