// service_type.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Variante de la cita: consulta médica o servicio de estética.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentKind {
  #[serde(rename = "medica")]
  Medical,
  #[serde(rename = "estetica")]
  Grooming,
}

impl AppointmentKind {
  pub fn as_str(self) -> &'static str {
    match self {
      AppointmentKind::Medical => "medica",
      AppointmentKind::Grooming => "estetica",
    }
  }

  /// Texto usado en asunto y cuerpo de los correos.
  pub fn display_name(self) -> &'static str {
    match self {
      AppointmentKind::Medical => "Consulta Médica",
      AppointmentKind::Grooming => "Servicio de Estética",
    }
  }
}

impl fmt::Display for AppointmentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for AppointmentKind {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "medica" | "médica" => Ok(AppointmentKind::Medical),
      "estetica" | "estética" => Ok(AppointmentKind::Grooming),
      other => Err(DomainError::ValidationError(format!("Tipo de cita no válido: {}", other))),
    }
  }
}

/// Tipos de consulta médica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsultationType {
  #[serde(rename = "primera_vez")]
  FirstVisit,
  #[serde(rename = "seguimiento")]
  FollowUp,
  #[serde(rename = "urgencia")]
  Emergency,
  #[serde(rename = "vacunacion")]
  Vaccination,
}

impl ConsultationType {
  pub fn as_str(self) -> &'static str {
    match self {
      ConsultationType::FirstVisit => "primera_vez",
      ConsultationType::FollowUp => "seguimiento",
      ConsultationType::Emergency => "urgencia",
      ConsultationType::Vaccination => "vacunacion",
    }
  }
}

/// Servicios de estética (grooming).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroomingService {
  #[serde(rename = "baño")]
  Bath,
  #[serde(rename = "corte")]
  Haircut,
  #[serde(rename = "baño_corte")]
  BathAndHaircut,
  #[serde(rename = "uñas")]
  Nails,
  #[serde(rename = "limpieza_dental")]
  DentalCleaning,
  #[serde(rename = "spa_premium")]
  SpaPremium,
  #[serde(rename = "deslanado")]
  Deshedding,
  #[serde(rename = "tratamiento_pulgas")]
  FleaTreatment,
  #[serde(rename = "otro")]
  Other,
}

impl GroomingService {
  pub fn as_str(self) -> &'static str {
    match self {
      GroomingService::Bath => "baño",
      GroomingService::Haircut => "corte",
      GroomingService::BathAndHaircut => "baño_corte",
      GroomingService::Nails => "uñas",
      GroomingService::DentalCleaning => "limpieza_dental",
      GroomingService::SpaPremium => "spa_premium",
      GroomingService::Deshedding => "deslanado",
      GroomingService::FleaTreatment => "tratamiento_pulgas",
      GroomingService::Other => "otro",
    }
  }

  /// Duración estimada por defecto, en minutos.
  pub fn default_duration(self) -> u32 {
    match self {
      GroomingService::Bath => 60,
      GroomingService::Haircut => 90,
      GroomingService::BathAndHaircut => 120,
      GroomingService::Nails => 20,
      GroomingService::DentalCleaning => 45,
      GroomingService::SpaPremium => 150,
      GroomingService::Deshedding => 90,
      GroomingService::FleaTreatment => 45,
      GroomingService::Other => 60,
    }
  }
}

/// Duración por defecto de una consulta médica, en minutos.
pub const MEDICAL_DEFAULT_DURATION: u32 = 30;

/// Servicio concreto de una cita. Las etiquetas de ambos catálogos son
/// disjuntas, así que se serializa como la etiqueta sin envoltorio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceType {
  Medical(ConsultationType),
  Grooming(GroomingService),
}

impl ServiceType {
  pub fn kind(self) -> AppointmentKind {
    match self {
      ServiceType::Medical(_) => AppointmentKind::Medical,
      ServiceType::Grooming(_) => AppointmentKind::Grooming,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ServiceType::Medical(c) => c.as_str(),
      ServiceType::Grooming(g) => g.as_str(),
    }
  }

  pub fn default_duration(self) -> u32 {
    match self {
      ServiceType::Medical(_) => MEDICAL_DEFAULT_DURATION,
      ServiceType::Grooming(g) => g.default_duration(),
    }
  }

  pub fn is_emergency(self) -> bool {
    matches!(self, ServiceType::Medical(ConsultationType::Emergency))
  }

  /// Nombre largo usado como título del evento de calendario.
  pub fn calendar_label(self) -> &'static str {
    match self {
      ServiceType::Medical(ConsultationType::FirstVisit) => "Primera Consulta",
      ServiceType::Medical(ConsultationType::FollowUp) => "Consulta de Seguimiento",
      ServiceType::Medical(ConsultationType::Emergency) => "Consulta de Urgencia",
      ServiceType::Medical(ConsultationType::Vaccination) => "Vacunación",
      ServiceType::Grooming(GroomingService::Bath) => "Servicio de Baño",
      ServiceType::Grooming(GroomingService::Haircut) => "Servicio de Corte",
      ServiceType::Grooming(GroomingService::BathAndHaircut) => "Baño y Corte",
      ServiceType::Grooming(GroomingService::Nails) => "Corte de Uñas",
      ServiceType::Grooming(GroomingService::DentalCleaning) => "Limpieza Dental",
      ServiceType::Grooming(GroomingService::SpaPremium) => "Spa Premium",
      ServiceType::Grooming(GroomingService::Deshedding) => "Deslanado",
      ServiceType::Grooming(GroomingService::FleaTreatment) => "Tratamiento Anti-pulgas",
      ServiceType::Grooming(GroomingService::Other) => "Servicio de Estética",
    }
  }

  /// Nombre corto usado en el cuerpo de los correos.
  pub fn short_label(self) -> &'static str {
    match self {
      ServiceType::Medical(ConsultationType::FirstVisit) => "Primera Vez",
      ServiceType::Medical(ConsultationType::FollowUp) => "Seguimiento",
      ServiceType::Medical(ConsultationType::Emergency) => "Urgencia",
      ServiceType::Medical(ConsultationType::Vaccination) => "Vacunación",
      ServiceType::Grooming(GroomingService::Bath) => "Baño",
      ServiceType::Grooming(GroomingService::Haircut) => "Corte",
      ServiceType::Grooming(GroomingService::BathAndHaircut) => "Baño y Corte",
      ServiceType::Grooming(GroomingService::Nails) => "Corte de Uñas",
      ServiceType::Grooming(GroomingService::DentalCleaning) => "Limpieza Dental",
      ServiceType::Grooming(GroomingService::SpaPremium) => "Spa Premium",
      ServiceType::Grooming(GroomingService::Deshedding) => "Deslanado",
      ServiceType::Grooming(GroomingService::FleaTreatment) => "Tratamiento Anti-pulgas",
      ServiceType::Grooming(GroomingService::Other) => "Otro",
    }
  }

  /// Interpreta una etiqueta dentro del catálogo de `kind`.
  pub fn parse_for(kind: AppointmentKind, label: &str) -> Result<Self, DomainError> {
    let quoted = serde_json::Value::String(label.trim().to_string());
    let parsed = match kind {
      AppointmentKind::Medical => serde_json::from_value::<ConsultationType>(quoted).map(ServiceType::Medical),
      AppointmentKind::Grooming => serde_json::from_value::<GroomingService>(quoted).map(ServiceType::Grooming),
    };
    parsed.map_err(|_| match kind {
            AppointmentKind::Medical => DomainError::ValidationError("Tipo de consulta no válido".to_string()),
            AppointmentKind::Grooming => DomainError::ValidationError("Tipo de servicio no válido".to_string()),
          })
  }
}

impl fmt::Display for ServiceType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
