// lib/src/appointments/mod.rs

pub mod lifecycle;
pub mod service;

pub use lifecycle::{Transition, DEFAULT_ACCEPTOR};
pub use service::{AcceptOutcome, AcceptRequest, AppointmentService, CompleteRequest};
