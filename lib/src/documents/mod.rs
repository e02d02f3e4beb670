// lib/src/documents/mod.rs

pub mod pdf;

pub use pdf::{DocumentRenderer, PrescriptionArchive, PrescriptionDocument, PrintPdfRenderer};
