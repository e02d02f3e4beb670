// lib/src/accounts.rs
// Patient registration and login, staff login and seeding. bcrypt work runs on
// the blocking pool.

use std::sync::Arc;

use tracing::{info, warn};

use models::errors::{ClinicError, ClinicResult};
use models::{NewPatientAccount, NewStaffMember, PatientAccount, PatientLogin, StaffLogin, StaffMember};

use crate::storage_engine::ClinicStorageEngine;

const BAD_PATIENT_CREDENTIALS: &str = "Invalid email or password";
const BAD_STAFF_CREDENTIALS: &str = "Invalid Staff ID or password";

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct AccountService {
    storage: Arc<dyn ClinicStorageEngine>,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(storage: Arc<dyn ClinicStorageEngine>, bcrypt_cost: u32) -> Self {
        Self { storage, bcrypt_cost }
    }

    pub async fn register(&self, request: NewPatientAccount) -> ClinicResult<PatientAccount> {
        let cost = self.bcrypt_cost;
        let account = tokio::task::spawn_blocking(move || PatientAccount::from_registration(request, cost)).await??;
        self.storage.insert_patient_account(&account).await.map_err(|e| match e {
            ClinicError::AlreadyExists(_) => ClinicError::AlreadyExists("Email is already registered".to_string()),
            other => other,
        })?;
        info!("Registered patient account {}", account.email);
        Ok(account)
    }

    pub async fn login(&self, request: PatientLogin) -> ClinicResult<PatientAccount> {
        let (email, password) = match (present(request.email), request.password.filter(|p| !p.is_empty())) {
            (Some(email), Some(password)) => (email.to_lowercase(), password),
            _ => return Err(ClinicError::invalid("Email and password are required")),
        };
        let Some(account) = self.storage.get_patient_account(&email).await? else {
            warn!("Login attempt for unknown patient {}", email);
            return Err(ClinicError::invalid(BAD_PATIENT_CREDENTIALS));
        };
        let candidate = account.clone();
        if !tokio::task::spawn_blocking(move || candidate.verify_password(&password)).await?? {
            warn!("Wrong password for patient {}", email);
            return Err(ClinicError::invalid(BAD_PATIENT_CREDENTIALS));
        }
        Ok(account)
    }

    pub async fn staff_login(&self, request: StaffLogin) -> ClinicResult<StaffMember> {
        let (staff_id, password) = match (present(request.staff_id), request.password.filter(|p| !p.is_empty())) {
            (Some(staff_id), Some(password)) => (staff_id, password),
            _ => return Err(ClinicError::invalid("Staff ID and password are required")),
        };
        let Some(staff) = self.storage.get_staff(&staff_id).await? else {
            warn!("Login attempt for unknown staff id {}", staff_id);
            return Err(ClinicError::invalid(BAD_STAFF_CREDENTIALS));
        };
        let candidate = staff.clone();
        if !tokio::task::spawn_blocking(move || candidate.verify_password(&password)).await?? {
            warn!("Wrong password for staff id {}", staff_id);
            return Err(ClinicError::invalid(BAD_STAFF_CREDENTIALS));
        }
        Ok(staff)
    }

    /// Creates or replaces a staff member.
    pub async fn seed_staff(&self, new_staff: NewStaffMember) -> ClinicResult<StaffMember> {
        let cost = self.bcrypt_cost;
        let staff = tokio::task::spawn_blocking(move || StaffMember::from_new(new_staff, cost)).await??;
        self.storage.put_staff(&staff).await?;
        info!("Seeded staff member {} ({})", staff.staff_id, staff.name);
        Ok(staff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::InMemoryClinicStorage;

    fn service() -> AccountService {
        AccountService::new(Arc::new(InMemoryClinicStorage::new()), 4)
    }

    fn registration(email: &str) -> NewPatientAccount {
        NewPatientAccount {
            name: Some("Ravi".into()),
            email: Some(email.into()),
            password: Some("s3cret".into()),
            phone: None,
        }
    }

    #[tokio::test]
    async fn register_then_login() -> ClinicResult<()> {
        let accounts = service();
        accounts.register(registration("Ravi@Mail.com")).await?;
        let account = accounts
            .login(PatientLogin { email: Some("ravi@mail.com".into()), password: Some("s3cret".into()) })
            .await?;
        assert_eq!(account.name, "Ravi");

        let wrong = accounts
            .login(PatientLogin { email: Some("ravi@mail.com".into()), password: Some("nope".into()) })
            .await;
        assert!(matches!(wrong, Err(ClinicError::Validation(m)) if m == vec![BAD_PATIENT_CREDENTIALS.to_string()]));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() -> ClinicResult<()> {
        let accounts = service();
        accounts.register(registration("ravi@mail.com")).await?;
        assert!(matches!(
            accounts.register(registration("ravi@mail.com")).await,
            Err(ClinicError::AlreadyExists(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn seeded_staff_can_log_in() -> ClinicResult<()> {
        let accounts = service();
        accounts
            .seed_staff(NewStaffMember { staff_id: "DOC001".into(), name: "Dr. Smith".into(), password: "doctor123".into() })
            .await?;
        let staff = accounts
            .staff_login(StaffLogin { staff_id: Some("DOC001".into()), password: Some("doctor123".into()) })
            .await?;
        assert_eq!(staff.name, "Dr. Smith");
        assert!(accounts
            .staff_login(StaffLogin { staff_id: Some("DOC002".into()), password: Some("doctor123".into()) })
            .await
            .is_err());
        Ok(())
    }
}
