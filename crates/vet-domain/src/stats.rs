// stats.rs
use crate::{Appointment, AppointmentStatus, DomainError};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Periodo para las estadísticas de citas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatsPeriod {
  #[serde(rename = "dia")]
  Day,
  #[serde(rename = "semana")]
  Week,
  #[default]
  #[serde(rename = "mes")]
  Month,
  #[serde(rename = "año", alias = "anio")]
  Year,
}

impl StatsPeriod {
  /// Primera fecha incluida en el periodo.
  pub fn start_date(self, today: NaiveDate) -> NaiveDate {
    let days = match self {
      StatsPeriod::Day => 0,
      StatsPeriod::Week => 7,
      StatsPeriod::Month => 30,
      StatsPeriod::Year => 365,
    };
    today - Duration::days(days)
  }
}

impl FromStr for StatsPeriod {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "dia" | "día" => Ok(StatsPeriod::Day),
      "semana" => Ok(StatsPeriod::Week),
      "mes" => Ok(StatsPeriod::Month),
      "año" | "anio" => Ok(StatsPeriod::Year),
      other => Err(DomainError::ValidationError(format!("Periodo no válido: {}", other))),
    }
  }
}

/// Conteo de citas por estado dentro de un periodo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentStats {
  pub total: u64,
  pub scheduled: u64,
  pub confirmed: u64,
  pub in_progress: u64,
  pub completed: u64,
  pub cancelled: u64,
  pub no_show: u64,
  pub emergencies: u64,
}

impl AppointmentStats {
  pub fn collect<'a, I>(appointments: I, period: StatsPeriod, today: NaiveDate) -> Self
    where I: IntoIterator<Item = &'a Appointment>
  {
    let from = period.start_date(today);
    let mut stats = AppointmentStats::default();
    for a in appointments.into_iter().filter(|a| a.date >= from) {
      stats.total += 1;
      match a.status {
        AppointmentStatus::Scheduled => stats.scheduled += 1,
        AppointmentStatus::Confirmed => stats.confirmed += 1,
        AppointmentStatus::InProgress => stats.in_progress += 1,
        AppointmentStatus::Completed => stats.completed += 1,
        AppointmentStatus::Cancelled => stats.cancelled += 1,
        AppointmentStatus::NoShow => stats.no_show += 1,
      }
      if a.service.is_emergency() {
        stats.emergencies += 1;
      }
    }
    stats
  }
}
