// Archivo: domain.rs
// Propósito: tipos auxiliares del ciclo de vida: resultado de persistencia
// con control optimista, solicitud de transición, registro de auditoría y
// filtros de consulta.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vet_domain::{Appointment, AppointmentKind, AppointmentStatus};

/// Resultado de `AppointmentRepository::save`.
///
/// `Conflict` indica que el estado persistido no coincidía con el esperado
/// y no se escribió nada.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistResult {
    Ok { appointment: Appointment },
    Conflict { actual: AppointmentStatus },
}

/// Acción registrada en la bitácora de una cita.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Creada,
    CambioEstado,
    Reprogramada,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Creada => "creada",
            ChangeAction::CambioEstado => "cambio_estado",
            ChangeAction::Reprogramada => "reprogramada",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "creada" => Some(ChangeAction::Creada),
            "cambio_estado" => Some(ChangeAction::CambioEstado),
            "reprogramada" => Some(ChangeAction::Reprogramada),
            _ => None,
        }
    }
}

/// Entrada de auditoría: quién cambió qué y cuándo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub action: ChangeAction,
    /// `None` en la entrada de creación.
    pub from: Option<AppointmentStatus>,
    pub to: AppointmentStatus,
    pub actor: String,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

/// Solicitud de cambio de estado.
///
/// Si `expected` está presente y el estado persistido es otro, la transición
/// falla con `ConflictingTransition` antes de validar el destino.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub target: AppointmentStatus,
    #[serde(default)]
    pub expected: Option<AppointmentStatus>,
    /// Motivo de cancelación.
    #[serde(default)]
    pub reason: Option<String>,
    /// Observaciones finales al completar.
    #[serde(default)]
    pub observations: Option<String>,
}

impl TransitionRequest {
    pub fn to(target: AppointmentStatus) -> Self {
        Self { target,
               expected: None,
               reason: None,
               observations: None }
    }

    pub fn expecting(mut self, expected: AppointmentStatus) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_observations(mut self, observations: impl Into<String>) -> Self {
        self.observations = Some(observations.into());
        self
    }
}

/// Filtro de listado. Los campos `None` no filtran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub from_date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub kind: Option<AppointmentKind>,
    pub patient_id: Option<Uuid>,
    pub resource_id: Option<Uuid>,
}

impl AppointmentFilter {
    pub fn matches(&self, a: &Appointment) -> bool {
        self.date.map_or(true, |d| a.date == d)
        && self.from_date.map_or(true, |d| a.date >= d)
        && self.status.map_or(true, |s| a.status == s)
        && self.kind.map_or(true, |k| a.kind == k)
        && self.patient_id.map_or(true, |p| a.patient_id == p)
        && self.resource_id.map_or(true, |r| a.resource_id == Some(r))
    }
}
