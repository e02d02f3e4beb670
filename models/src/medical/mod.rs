// models/src/medical/mod.rs

pub mod account;
pub mod appointment;
pub mod patient_visit;
pub mod prescription;

pub use account::{NewPatientAccount, NewStaffMember, PatientAccount, PatientLogin, StaffLogin, StaffMember};
pub use appointment::{Appointment, AppointmentStatus, NewAppointment};
pub use patient_visit::PatientVisit;
pub use prescription::{
    invoice_totals, InvoiceData, InvoiceLine, Prescription, PrescriptionData, PrescriptionStatus,
    INVOICE_DISCOUNT_RATE, MAX_MEDICINE_LINES,
};
