// appointment.rs
use crate::{AppointmentKind, AppointmentStatus, DomainError, ServiceType};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Duración máxima aceptada para una cita, en minutos (un día).
pub const MAX_ESTIMATED_DURATION: u32 = 24 * 60;

/// Cita médica o de estética.
///
/// `id` se asigna al crear la cita y no cambia. El paciente es dueño de la
/// relación: aquí sólo se guarda su referencia (`patient_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
  pub id: Uuid,
  pub kind: AppointmentKind,
  pub patient_id: Uuid,
  /// Doctor (citas médicas) o estilista (estética).
  pub resource_id: Option<Uuid>,
  pub service: ServiceType,
  pub date: NaiveDate,
  pub time: NaiveTime,
  pub status: AppointmentStatus,
  pub estimated_duration: Option<u32>,
  pub price: Option<Decimal>,
  pub notes: Option<String>,
  pub cut_style: Option<String>,
  pub cancellation_reason: Option<String>,
  pub final_observations: Option<String>,
  pub confirmed_at: Option<DateTime<Utc>>,
  pub reminder_sent_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Appointment {
  pub fn starts_at(&self) -> NaiveDateTime {
    self.date.and_time(self.time)
  }

  /// Duración en minutos: la estimada o la del servicio por defecto.
  pub fn duration_minutes(&self) -> u32 {
    self.estimated_duration.unwrap_or_else(|| self.service.default_duration())
  }

  pub fn ends_at(&self) -> NaiveDateTime {
    self.starts_at() + Duration::minutes(i64::from(self.duration_minutes()))
  }

  /// Dos citas chocan si son del mismo tipo, usan el mismo recurso y
  /// ocupan la misma fecha y hora sin haber liberado el horario.
  pub fn occupies(&self, kind: AppointmentKind, resource_id: Uuid, date: NaiveDate, time: NaiveTime) -> bool {
    self.kind == kind
    && self.resource_id == Some(resource_id)
    && self.date == date
    && self.time == time
    && !self.status.releases_slot()
  }
}

impl fmt::Display for Appointment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "Cita({} {} {} {} [{}])",
           self.id, self.kind, self.date, self.time, self.status)
  }
}

/// Solicitud de reserva. Se valida con `into_appointment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
  pub kind: AppointmentKind,
  pub patient_id: Uuid,
  #[serde(default)]
  pub resource_id: Option<Uuid>,
  /// Etiqueta del servicio; para citas médicas se usa `seguimiento` si
  /// falta.
  #[serde(default)]
  pub service_type: Option<String>,
  pub date: NaiveDate,
  pub time: NaiveTime,
  #[serde(default)]
  pub estimated_duration: Option<u32>,
  #[serde(default)]
  pub price: Option<Decimal>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub cut_style: Option<String>,
}

impl NewAppointment {
  /// Construye la cita en estado `programada`, validando el catálogo de
  /// servicios, que la fecha no sea pasada y los metadatos numéricos.
  pub fn into_appointment(self, today: NaiveDate, now: DateTime<Utc>) -> Result<Appointment, DomainError> {
    let service = match (self.kind, self.service_type.as_deref()) {
      (AppointmentKind::Medical, None) => ServiceType::parse_for(AppointmentKind::Medical, "seguimiento")?,
      (AppointmentKind::Grooming, None) => {
        return Err(DomainError::ValidationError("Paciente, fecha, hora y tipo de servicio son obligatorios".to_string()))
      }
      (kind, Some(label)) => ServiceType::parse_for(kind, label)?,
    };
    if self.date < today {
      return Err(DomainError::ValidationError("No se pueden programar citas en fechas pasadas".to_string()));
    }
    if let Some(price) = self.price {
      if price.is_sign_negative() {
        return Err(DomainError::ValidationError("El precio no puede ser negativo".to_string()));
      }
    }
    if let Some(minutes) = self.estimated_duration {
      check_duration(minutes)?;
    }
    let estimated_duration = self.estimated_duration.or(Some(service.default_duration()));
    Ok(Appointment { id: Uuid::new_v4(),
                     kind: self.kind,
                     patient_id: self.patient_id,
                     resource_id: self.resource_id,
                     service,
                     date: self.date,
                     time: self.time,
                     status: AppointmentStatus::Scheduled,
                     estimated_duration,
                     price: self.price,
                     notes: normalize(self.notes),
                     cut_style: normalize(self.cut_style),
                     cancellation_reason: None,
                     final_observations: None,
                     confirmed_at: None,
                     reminder_sent_at: None,
                     created_at: now,
                     updated_at: now })
  }
}

/// Cambios permitidos sobre una cita no terminal (reprogramación).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentUpdate {
  #[serde(default)]
  pub date: Option<NaiveDate>,
  #[serde(default)]
  pub time: Option<NaiveTime>,
  #[serde(default)]
  pub resource_id: Option<Uuid>,
  #[serde(default)]
  pub estimated_duration: Option<u32>,
  #[serde(default)]
  pub price: Option<Decimal>,
  #[serde(default)]
  pub notes: Option<String>,
}

impl AppointmentUpdate {
  /// Aplica los cambios sobre una copia de `current`.
  pub fn apply_to(&self, current: &Appointment, today: NaiveDate, now: DateTime<Utc>) -> Result<Appointment, DomainError> {
    if current.status.is_terminal() {
      return Err(DomainError::ValidationError(format!("No se puede modificar una cita {}", current.status)));
    }
    let mut next = current.clone();
    if let Some(date) = self.date {
      if date < today {
        return Err(DomainError::ValidationError("No se pueden programar citas en fechas pasadas".to_string()));
      }
      next.date = date;
    }
    if let Some(time) = self.time {
      next.time = time;
    }
    if let Some(resource) = self.resource_id {
      next.resource_id = Some(resource);
    }
    if let Some(minutes) = self.estimated_duration {
      check_duration(minutes)?;
      next.estimated_duration = Some(minutes);
    }
    if let Some(price) = self.price {
      if price.is_sign_negative() {
        return Err(DomainError::ValidationError("El precio no puede ser negativo".to_string()));
      }
      next.price = Some(price);
    }
    if self.notes.is_some() {
      next.notes = normalize(self.notes.clone());
    }
    next.updated_at = now;
    Ok(next)
  }

  /// Indica si el cambio mueve la cita a otro horario o recurso.
  pub fn moves_slot(&self, current: &Appointment) -> bool {
    self.date.is_some_and(|d| d != current.date)
    || self.time.is_some_and(|t| t != current.time)
    || self.resource_id.is_some_and(|r| Some(r) != current.resource_id)
  }
}

fn check_duration(minutes: u32) -> Result<(), DomainError> {
  if minutes == 0 {
    return Err(DomainError::ValidationError("La duración estimada debe ser mayor a cero".to_string()));
  }
  if minutes > MAX_ESTIMATED_DURATION {
    return Err(DomainError::ValidationError(format!("La duración estimada no puede superar {} minutos",
                                                    MAX_ESTIMATED_DURATION)));
  }
  Ok(())
}

fn normalize(text: Option<String>) -> Option<String> {
  text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
