mod appointment;
mod contact_directory;
mod domain_stubs;
mod errors;
mod scheduling;
mod service_type;
mod stats;
mod status;

pub use appointment::{Appointment, AppointmentUpdate, NewAppointment, MAX_ESTIMATED_DURATION};
pub use contact_directory::{ContactDirectory, InMemoryContactDirectory, PatientContact};
pub use domain_stubs::DomainStubs;
pub use errors::DomainError;
pub use scheduling::SlotGrid;
pub use service_type::{AppointmentKind, ConsultationType, GroomingService, ServiceType, MEDICAL_DEFAULT_DURATION};
pub use stats::{AppointmentStats, StatsPeriod};
pub use status::AppointmentStatus;
