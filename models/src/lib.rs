// models/src/lib.rs

pub mod errors;
pub mod identifiers;
pub mod medical;

pub use errors::{ClinicError, ClinicResult};
pub use identifiers::SlotKey;
pub use medical::*;
