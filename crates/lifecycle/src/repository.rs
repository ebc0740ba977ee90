// Archivo: repository.rs
// Propósito: definir el trait `AppointmentRepository`, el contrato que deben
// implementar las persistencias (SQLite, in-memory, etc.).
use crate::domain::{AppointmentFilter, PersistResult, StatusChange};
use crate::errors::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;
use vet_domain::{Appointment, AppointmentKind, AppointmentStatus};

/// Contrato del repositorio de citas.
///
/// Las escrituras sobre una cita existente usan control optimista sobre el
/// estado: `save` sólo aplica si el estado persistido coincide con
/// `expected_status`; si no, devuelve `PersistResult::Conflict` sin tocar
/// nada. Las reservas y reprogramaciones comprueban el horario dentro de la
/// misma escritura, de modo que dos llamadas concurrentes no pueden ocupar
/// el mismo hueco.
pub trait AppointmentRepository: Send + Sync {
    /// Carga una cita. `NotFound` si no existe.
    fn load(&self, id: &Uuid) -> Result<Appointment>;

    /// Inserta una cita nueva.
    fn insert(&self, appointment: &Appointment) -> Result<()>;

    /// Inserta la cita si su recurso no tiene otra cita activa a la misma
    /// fecha y hora. `SlotTaken` si el horario está ocupado.
    fn insert_if_free(&self, appointment: &Appointment) -> Result<()>;

    /// Reemplaza la cita si su estado persistido es `expected_status`.
    fn save(&self, appointment: &Appointment, expected_status: AppointmentStatus) -> Result<PersistResult>;

    /// Guarda una reprogramación. Aplica sólo si el estado y `updated_at`
    /// persistidos son los esperados (si no, `Conflict`). Si la cita cambia de
    /// fecha, hora o recurso, el horario nuevo se comprueba en la misma
    /// operación y devuelve `SlotTaken` si está ocupado.
    fn save_rescheduled(&self,
                        appointment: &Appointment,
                        expected_status: AppointmentStatus,
                        expected_updated_at: DateTime<Utc>)
                        -> Result<PersistResult>;

    /// Elimina la cita y su bitácora.
    fn delete(&self, id: &Uuid) -> Result<()>;

    /// Lista citas que cumplen el filtro, ordenadas por fecha y hora.
    fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>>;

    /// Horas ocupadas (estado no liberado) de un recurso en una fecha.
    fn occupied_times(&self, kind: AppointmentKind, resource_id: &Uuid, date: NaiveDate) -> Result<Vec<NaiveTime>>;

    /// Añade una entrada a la bitácora de la cita.
    fn record_change(&self, change: &StatusChange) -> Result<()>;

    /// Bitácora de la cita en orden cronológico.
    fn history(&self, appointment_id: &Uuid) -> Result<Vec<StatusChange>>;

    /// Marca el recordatorio como enviado (no cambia el estado).
    fn mark_reminder_sent(&self, id: &Uuid, at: DateTime<Utc>) -> Result<()>;
}
