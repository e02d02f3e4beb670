// lib/src/dashboard/mod.rs

pub mod stats;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::debug;

use models::errors::ClinicResult;

use crate::storage_engine::ClinicStorageEngine;

pub use stats::{
    parse_appointment_date, patient_stats, revenue_stats, visit_stats, DateWindows, PatientStats, RevenueStats,
    VisitStats, ACTIVE_WINDOW_DAYS,
};

/// Loads the collections and runs the aggregations against the local date.
#[derive(Clone)]
pub struct DashboardService {
    storage: Arc<dyn ClinicStorageEngine>,
}

impl DashboardService {
    pub fn new(storage: Arc<dyn ClinicStorageEngine>) -> Self {
        Self { storage }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    pub async fn revenue(&self) -> ClinicResult<RevenueStats> {
        self.revenue_on(Self::today()).await
    }

    pub async fn revenue_on(&self, today: NaiveDate) -> ClinicResult<RevenueStats> {
        let appointments = self.storage.list_appointments(None).await?;
        let prescriptions = self.storage.list_prescriptions().await?;
        let stats = revenue_stats(&appointments, &prescriptions, today);
        debug!("Revenue stats for {}: {:?}", today, stats);
        Ok(stats)
    }

    pub async fn visits(&self) -> ClinicResult<VisitStats> {
        self.visits_on(Self::today()).await
    }

    pub async fn visits_on(&self, today: NaiveDate) -> ClinicResult<VisitStats> {
        let appointments = self.storage.list_appointments(None).await?;
        Ok(visit_stats(&appointments, today))
    }

    pub async fn patients(&self) -> ClinicResult<PatientStats> {
        self.patients_on(Self::today()).await
    }

    pub async fn patients_on(&self, today: NaiveDate) -> ClinicResult<PatientStats> {
        let appointments = self.storage.list_appointments(None).await?;
        Ok(patient_stats(&appointments, today))
    }
}
