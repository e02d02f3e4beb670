// lib/src/scheduling/mod.rs

pub mod slots;

pub use slots::{SlotAvailability, SlotCatalog};
