// Archivo: errors.rs
// Propósito: definir los errores del ciclo de vida de citas y el alias
// Result<T> usado por las APIs del crate.
use thiserror::Error;
use vet_domain::{AppointmentStatus, DomainError};

/// Errores del gestor de ciclo de vida.
///
/// - `InvalidTransition`: el destino no es sucesor legal del estado actual.
/// - `ConflictingTransition`: el estado persistido ya no coincide con el
///   esperado por el llamador (lectura obsoleta).
/// - `NotFound`: la cita no existe.
/// - `Storage`: fallo del almacenamiento (transitorio, reintentable).
/// - `Validation`: datos de reserva o modificación inválidos.
/// - `SlotTaken`: el horario ya está ocupado para ese recurso.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
  #[error("Transición no válida: {from} -> {to}")]
  InvalidTransition { from: AppointmentStatus, to: AppointmentStatus },
  #[error("Conflicto: se esperaba {expected} pero la cita está {actual}")]
  ConflictingTransition { expected: AppointmentStatus, actual: AppointmentStatus },
  #[error("No encontrado: {0}")]
  NotFound(String),
  #[error("Error de almacenamiento: {0}")]
  Storage(String),
  #[error("Error de validación: {0}")]
  Validation(String),
  #[error("Horario ocupado: {0}")]
  SlotTaken(String),
}

impl From<DomainError> for LifecycleError {
  fn from(e: DomainError) -> Self {
    match e {
      DomainError::ValidationError(msg) => LifecycleError::Validation(msg),
      DomainError::ExternalError(msg) => LifecycleError::Storage(msg),
      DomainError::SerializationError(msg) => LifecycleError::Storage(msg),
    }
  }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, LifecycleError>;
