// lib/src/services.rs
// Wires the storage engine, mailer and document pipeline into the services
// the HTTP layer and the CLI call.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use notifications_service::{DisabledMailer, HttpRelayMailer, HttpRelaySettings, Mailer};

use crate::accounts::AccountService;
use crate::appointments::AppointmentService;
use crate::config::{ClinicConfig, EmailConfig};
use crate::dashboard::DashboardService;
use crate::documents::{PrescriptionArchive, PrintPdfRenderer};
use crate::prescriptions::PrescriptionService;
use crate::scheduling::SlotCatalog;
use crate::storage_engine::{create_storage, ClinicStorageEngine};
use crate::visits::PatientVisitService;

/// HTTP relay when `email.relay_url` is set, otherwise a mailer that reports
/// every send as not delivered.
pub fn build_mailer(config: &EmailConfig) -> Result<Arc<dyn Mailer>> {
    match config.relay_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(relay_url) => {
            let mailer = HttpRelayMailer::new(HttpRelaySettings {
                relay_url: relay_url.to_string(),
                api_key: config.api_key.clone(),
                from_address: config.from_address.clone(),
                timeout: config.timeout(),
            })
            .context("Failed to build the mail relay client")?;
            info!("Email delivery through relay {}", relay_url);
            Ok(Arc::new(mailer))
        }
        None => {
            info!("No email relay configured; notification emails are disabled");
            Ok(Arc::new(DisabledMailer))
        }
    }
}

#[derive(Clone)]
pub struct ClinicServices {
    pub storage: Arc<dyn ClinicStorageEngine>,
    pub appointments: AppointmentService,
    pub prescriptions: Arc<PrescriptionService>,
    pub dashboard: DashboardService,
    pub visits: PatientVisitService,
    pub accounts: AccountService,
}

impl ClinicServices {
    pub fn from_config(config: &ClinicConfig) -> Result<Self> {
        let storage = create_storage(&config.storage)?;
        let mailer = build_mailer(&config.email)?;
        Ok(Self::assemble(config, storage, mailer))
    }

    /// Builds the services over a given store and mailer.
    pub fn assemble(config: &ClinicConfig, storage: Arc<dyn ClinicStorageEngine>, mailer: Arc<dyn Mailer>) -> Self {
        let clinic_name = config.email.clinic_name.clone();
        Self {
            appointments: AppointmentService::new(
                storage.clone(),
                SlotCatalog::from_config(&config.schedule),
                mailer.clone(),
                clinic_name.clone(),
            ),
            prescriptions: Arc::new(PrescriptionService::new(
                storage.clone(),
                Arc::new(PrintPdfRenderer),
                PrescriptionArchive::new(config.documents.prescriptions_directory.clone()),
                mailer,
                clinic_name,
            )),
            dashboard: DashboardService::new(storage.clone()),
            visits: PatientVisitService::new(storage.clone()),
            accounts: AccountService::new(storage.clone(), config.auth.bcrypt_cost),
            storage,
        }
    }
}
