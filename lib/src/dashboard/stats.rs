// lib/src/dashboard/stats.rs
// Descriptive statistics over full scans of appointments and prescriptions.
// Every function takes `today` explicitly; nothing here reads the clock.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use models::{Appointment, AppointmentStatus, Prescription};

/// Patients with an appointment dated on or after `today - ACTIVE_WINDOW_DAYS`
/// count as active.
pub const ACTIVE_WINDOW_DAYS: i64 = 90;

/// Reads an appointment date written as `YYYY-MM-DD`, RFC 3339 or
/// `MM/DD/YYYY`.
pub fn parse_appointment_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| NaiveDate::parse_from_str(raw, "%m/%d/%Y").ok())
}

/// Today, the Monday-to-Sunday week containing it, and its calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindows {
    pub today: NaiveDate,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
}

impl DateWindows {
    pub fn new(today: NaiveDate) -> Self {
        let back_to_monday = today.weekday().num_days_from_monday() as i64;
        let week_start = today - Duration::days(back_to_monday);
        Self { today, week_start, week_end: week_start + Duration::days(6) }
    }

    pub fn is_today(&self, date: NaiveDate) -> bool {
        date == self.today
    }

    pub fn in_week(&self, date: NaiveDate) -> bool {
        date >= self.week_start && date <= self.week_end
    }

    pub fn in_month(&self, date: NaiveDate) -> bool {
        date.year() == self.today.year() && date.month() == self.today.month()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueStats {
    pub total_revenue: i64,
    pub today_revenue: i64,
    pub week_revenue: i64,
    pub month_revenue: i64,
    /// The current month's revenue; not a historical average.
    pub avg_monthly: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitStats {
    pub today_visits: u64,
    pub week_visits: u64,
    pub month_visits: u64,
    pub daily_avg: f64,
    pub today_appointments: u64,
    pub week_appointments: u64,
    pub month_appointments: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStats {
    pub total_patients: u64,
    pub active_patients: u64,
    pub new_this_month: u64,
    pub returning_rate: u64,
}

/// The prescription backing each appointment: the one the appointment links
/// to, else the newest one referencing it.
fn prescriptions_by_appointment(prescriptions: &[Prescription]) -> HashMap<Uuid, Vec<&Prescription>> {
    let mut by_appointment: HashMap<Uuid, Vec<&Prescription>> = HashMap::new();
    for prescription in prescriptions {
        by_appointment.entry(prescription.appointment_id).or_default().push(prescription);
    }
    for list in by_appointment.values_mut() {
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
    by_appointment
}

fn round_currency(amount: f64) -> i64 {
    amount.round() as i64
}

pub fn revenue_stats(appointments: &[Appointment], prescriptions: &[Prescription], today: NaiveDate) -> RevenueStats {
    let windows = DateWindows::new(today);
    let by_appointment = prescriptions_by_appointment(prescriptions);
    let (mut total, mut day, mut week, mut month) = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);

    for appointment in appointments.iter().filter(|a| a.status == AppointmentStatus::Completed) {
        let Some(candidates) = by_appointment.get(&appointment.id) else { continue };
        let prescription = appointment
            .prescription_id
            .and_then(|linked| candidates.iter().find(|p| p.id == linked))
            .or_else(|| candidates.first());
        let Some(prescription) = prescription else { continue };
        let amount = prescription.invoice_data.billed_amount();

        total += amount;
        if let Some(date) = parse_appointment_date(&appointment.date) {
            if windows.is_today(date) {
                day += amount;
            }
            if windows.in_week(date) {
                week += amount;
            }
            if windows.in_month(date) {
                month += amount;
            }
        }
    }

    RevenueStats {
        total_revenue: round_currency(total),
        today_revenue: round_currency(day),
        week_revenue: round_currency(week),
        month_revenue: round_currency(month),
        avg_monthly: round_currency(month),
    }
}

pub fn visit_stats(appointments: &[Appointment], today: NaiveDate) -> VisitStats {
    let windows = DateWindows::new(today);
    let mut stats = VisitStats::default();

    for appointment in appointments {
        let Some(date) = parse_appointment_date(&appointment.date) else { continue };
        let completed = appointment.is_completed();
        if windows.is_today(date) {
            stats.today_appointments += 1;
            stats.today_visits += completed as u64;
        }
        if windows.in_week(date) {
            stats.week_appointments += 1;
            stats.week_visits += completed as u64;
        }
        if windows.in_month(date) {
            stats.month_appointments += 1;
            stats.month_visits += completed as u64;
        }
    }

    let days_passed = f64::from(today.day());
    stats.daily_avg = (stats.month_visits as f64 / days_passed * 10.0).round() / 10.0;
    stats
}

pub fn patient_stats(appointments: &[Appointment], today: NaiveDate) -> PatientStats {
    let windows = DateWindows::new(today);
    let active_since = today - Duration::days(ACTIVE_WINDOW_DAYS);
    let mut everyone: HashSet<&str> = HashSet::new();
    let mut active: HashSet<&str> = HashSet::new();
    let mut this_month: HashSet<&str> = HashSet::new();

    for appointment in appointments {
        let email = appointment.patient_email.as_str();
        everyone.insert(email);
        let Some(date) = parse_appointment_date(&appointment.date) else { continue };
        if date >= active_since {
            active.insert(email);
        }
        if windows.in_month(date) {
            this_month.insert(email);
        }
    }

    let total = everyone.len() as u64;
    let active_count = active.len() as u64;
    let returning_rate = if total == 0 {
        0
    } else {
        (active_count as f64 / total as f64 * 100.0).round() as u64
    };
    PatientStats {
        total_patients: total,
        active_patients: active_count,
        new_this_month: this_month.len() as u64,
        returning_rate,
    }
}
