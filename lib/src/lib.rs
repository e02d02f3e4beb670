// lib/src/lib.rs
// Core of the clinic service. Domain records live in the `models` crate.

pub mod accounts;
pub mod appointments;
pub mod config;
pub mod dashboard;
pub mod documents;
pub mod prescriptions;
pub mod scheduling;
pub mod services;
pub mod storage_engine;
pub mod visits;

pub use models::errors::{ClinicError, ClinicResult};

pub use crate::accounts::AccountService;
pub use crate::appointments::{AcceptOutcome, AcceptRequest, AppointmentService, CompleteRequest};
pub use crate::config::{load_clinic_config, ClinicConfig};
pub use crate::dashboard::DashboardService;
pub use crate::prescriptions::{GeneratePrescriptionRequest, GeneratedPrescription, PrescriptionService};
pub use crate::scheduling::{SlotAvailability, SlotCatalog};
pub use crate::services::{build_mailer, ClinicServices};
pub use crate::storage_engine::{
    create_storage, open_sled_db, ClinicStorageEngine, InMemoryClinicStorage, SledClinicStorage, SlotIndexReport,
};
pub use crate::visits::PatientVisitService;
