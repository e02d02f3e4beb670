// models/src/medical/account.rs
// Patient and staff accounts. Only bcrypt hashes are ever stored.

use bcrypt::{hash, verify, BcryptError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ClinicError, ClinicResult};

fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    hash(password, cost)
}

fn verify_password(password: &str, password_hash: &str) -> Result<bool, BcryptError> {
    verify(password, password_hash)
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// --- DTO for patient self-registration ---
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewPatientAccount {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl PatientAccount {
    /// Creates an account from a registration request, hashing the password.
    pub fn from_registration(request: NewPatientAccount, cost: u32) -> ClinicResult<Self> {
        let (name, email, password) = match (
            non_blank(&request.name),
            non_blank(&request.email),
            request.password.filter(|p| !p.is_empty()),
        ) {
            (Some(name), Some(email), Some(password)) => (name, email.to_lowercase(), password),
            _ => return Err(ClinicError::invalid("Name, email and password are required")),
        };

        Ok(PatientAccount {
            id: Uuid::new_v4(),
            name,
            email,
            phone: non_blank(&request.phone),
            password_hash: hash_password(&password, cost)?,
            created_at: Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> ClinicResult<bool> {
        Ok(verify_password(password, &self.password_hash)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaffMember {
    pub staff_id: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: Uuid,
    pub staff_id: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl StaffMember {
    pub fn from_new(new_staff: NewStaffMember, cost: u32) -> ClinicResult<Self> {
        let staff_id = new_staff.staff_id.trim().to_string();
        let name = new_staff.name.trim().to_string();
        if staff_id.is_empty() || name.is_empty() || new_staff.password.is_empty() {
            return Err(ClinicError::invalid("Staff ID, name and password are required"));
        }
        Ok(StaffMember {
            id: Uuid::new_v4(),
            staff_id,
            name,
            password_hash: hash_password(&new_staff.password, cost)?,
            created_at: Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> ClinicResult<bool> {
        Ok(verify_password(password, &self.password_hash)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientLogin {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffLogin {
    pub staff_id: Option<String>,
    pub password: Option<String>,
}
