// lib/src/prescriptions/mod.rs

pub mod service;

pub use service::{
    derive_patient_id, parse_required_id, GeneratePrescriptionRequest, GeneratedPrescription, PrescriptionService,
};
