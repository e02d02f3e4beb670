// models/src/identifiers.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ClinicError, ClinicResult};

const SEPARATOR: u8 = 0;

/// Identifies one bookable slot: a calendar date string plus a slot label.
/// The byte encoding is `date \0 time`, so every slot of one date shares the
/// `date \0` prefix and can be scanned together.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SlotKey {
    pub date: String,
    pub time: String,
}

impl SlotKey {
    /// Creates a new slot key.
    ///
    /// # Errors
    /// Returns a validation error when either component is blank or contains
    /// the NUL separator.
    pub fn new(date: impl Into<String>, time: impl Into<String>) -> ClinicResult<Self> {
        let date = date.into();
        let time = time.into();
        let mut problems = Vec::new();
        if date.trim().is_empty() || date.as_bytes().contains(&SEPARATOR) {
            problems.push(format!("invalid slot date '{}'", date));
        }
        if time.trim().is_empty() || time.as_bytes().contains(&SEPARATOR) {
            problems.push(format!("invalid slot time '{}'", time));
        }
        if !problems.is_empty() {
            return Err(ClinicError::Validation(problems));
        }
        Ok(Self { date, time })
    }

    /// Prefix shared by all slot keys of `date`.
    pub fn date_prefix(date: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(date.len() + 1);
        prefix.extend_from_slice(date.as_bytes());
        prefix.push(SEPARATOR);
        prefix
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut key = Self::date_prefix(&self.date);
        key.extend_from_slice(self.time.as_bytes());
        key
    }

    pub fn from_bytes(bytes: &[u8]) -> ClinicResult<Self> {
        let pos = bytes
            .iter()
            .position(|b| *b == SEPARATOR)
            .ok_or_else(|| ClinicError::DeserializationError("slot key without separator".to_string()))?;
        let date = String::from_utf8(bytes[..pos].to_vec())
            .map_err(|e| ClinicError::DeserializationError(e.to_string()))?;
        let time = String::from_utf8(bytes[pos + 1..].to_vec())
            .map_err(|e| ClinicError::DeserializationError(e.to_string()))?;
        Ok(Self { date, time })
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}
