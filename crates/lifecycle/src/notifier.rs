// Archivo: notifier.rs
// Propósito: contrato del despachador de notificaciones que el servicio
// invoca al confirmar una cita.
use thiserror::Error;
use vet_domain::Appointment;

/// Fallos de entrega. El servicio nunca los propaga: sólo los registra.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
  #[error("Destinatario no disponible: {0}")]
  MissingRecipient(String),
  #[error("Error al enviar la notificación: {0}")]
  Delivery(String),
  #[error("Despachador no disponible: {0}")]
  Unavailable(String),
}

/// Despachador de notificaciones.
///
/// `send_confirmation` debe volver rápido: las implementaciones que hablan
/// con la red encolan el envío y devuelven `Ok(())`. Un `Err` sólo indica que
/// la solicitud no pudo siquiera encolarse.
pub trait Notifier: Send + Sync {
  fn send_confirmation(&self, appointment: &Appointment) -> Result<(), NotifyError>;
}
