//! Per-kind strategies for [`crate::resolver::resolve_or_create`]

mod appointment;
mod contact;
mod patient;
mod wellness;

pub use appointment::AppointmentStrategy;
pub use contact::{contact_search_pattern, ContactStrategy};
pub use patient::{patient_search_pattern, PatientStrategy};
pub use wellness::WellnessPlanStrategy;
