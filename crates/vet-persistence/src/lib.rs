//! Persistencia SQLite (Diesel) para el trait `AppointmentRepository` y el
//! directorio de contactos `ContactDirectory`. La implementación está en
//! `appointment_persistence.rs`; las migraciones se embeben en el binario.

mod appointment_persistence;
pub mod schema;

pub use appointment_persistence::{new_from_env, open_sqlite, DieselAppointmentRepository, MIGRATIONS};
