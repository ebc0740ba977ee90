// status.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Estado de una cita (médica o de estética).
///
/// Las citas médicas y de estética comparten una única máquina de estados;
/// `InProgress` se serializa como `en_curso` y acepta `en_proceso` como
/// alias al deserializar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
  #[serde(rename = "programada")]
  Scheduled,
  #[serde(rename = "confirmada")]
  Confirmed,
  #[serde(rename = "en_curso", alias = "en_proceso")]
  InProgress,
  #[serde(rename = "completada")]
  Completed,
  #[serde(rename = "cancelada")]
  Cancelled,
  #[serde(rename = "no_asistio")]
  NoShow,
}

const FROM_SCHEDULED: &[AppointmentStatus] =
  &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled, AppointmentStatus::NoShow];
const FROM_CONFIRMED: &[AppointmentStatus] =
  &[AppointmentStatus::InProgress, AppointmentStatus::Cancelled, AppointmentStatus::NoShow];
const FROM_IN_PROGRESS: &[AppointmentStatus] = &[AppointmentStatus::Completed, AppointmentStatus::Cancelled];

impl AppointmentStatus {
  pub const ALL: [AppointmentStatus; 6] = [AppointmentStatus::Scheduled,
                                           AppointmentStatus::Confirmed,
                                           AppointmentStatus::InProgress,
                                           AppointmentStatus::Completed,
                                           AppointmentStatus::Cancelled,
                                           AppointmentStatus::NoShow];

  /// Sucesores legales de este estado. Vacío para los estados terminales.
  pub fn successors(self) -> &'static [AppointmentStatus] {
    match self {
      AppointmentStatus::Scheduled => FROM_SCHEDULED,
      AppointmentStatus::Confirmed => FROM_CONFIRMED,
      AppointmentStatus::InProgress => FROM_IN_PROGRESS,
      AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow => &[],
    }
  }

  pub fn can_transition_to(self, target: AppointmentStatus) -> bool {
    self.successors().contains(&target)
  }

  pub fn is_terminal(self) -> bool {
    self.successors().is_empty()
  }

  /// Una cita cancelada o a la que no se asistió libera su horario.
  pub fn releases_slot(self) -> bool {
    matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
  }

  /// Estados en los que aún se envía recordatorio.
  pub fn is_pending(self) -> bool {
    matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      AppointmentStatus::Scheduled => "programada",
      AppointmentStatus::Confirmed => "confirmada",
      AppointmentStatus::InProgress => "en_curso",
      AppointmentStatus::Completed => "completada",
      AppointmentStatus::Cancelled => "cancelada",
      AppointmentStatus::NoShow => "no_asistio",
    }
  }
}

impl fmt::Display for AppointmentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for AppointmentStatus {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "programada" => Ok(AppointmentStatus::Scheduled),
      "confirmada" => Ok(AppointmentStatus::Confirmed),
      "en_curso" | "en_proceso" => Ok(AppointmentStatus::InProgress),
      "completada" => Ok(AppointmentStatus::Completed),
      "cancelada" => Ok(AppointmentStatus::Cancelled),
      "no_asistio" => Ok(AppointmentStatus::NoShow),
      other => Err(DomainError::ValidationError(format!("Estado no válido: {}", other))),
    }
  }
}
