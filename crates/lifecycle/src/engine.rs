// Archivo: engine.rs
// Propósito: máquina de estados de la cita. Funciones puras: no persisten
// ni notifican, sólo validan el destino y devuelven la cita actualizada.
use crate::domain::TransitionRequest;
use crate::errors::{LifecycleError, Result};
use chrono::{DateTime, Utc};
use vet_domain::{Appointment, AppointmentStatus};

/// Motivo registrado cuando una cancelación llega sin motivo.
pub const DEFAULT_CANCELLATION_REASON: &str = "Sin motivo especificado";

/// Motor de transiciones.
///
/// La tabla de sucesores vive en `AppointmentStatus::successors`; el motor
/// la aplica y rellena los datos que acompañan a cada destino:
/// - `confirmada`: fecha de confirmación.
/// - `cancelada`: motivo (por defecto `Sin motivo especificado`).
/// - `completada`: observaciones finales, si las hay.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleEngine;

impl LifecycleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Sucesores legales de `status`. Vacío para los estados terminales.
    pub fn legal_transitions(&self, status: AppointmentStatus) -> Vec<AppointmentStatus> {
        status.successors().to_vec()
    }

    /// Aplica `target` sin datos adicionales.
    pub fn transition(&self, appointment: &Appointment, target: AppointmentStatus) -> Result<Appointment> {
        self.apply(appointment, &TransitionRequest::to(target), Utc::now())
    }

    /// Valida la transición y devuelve una copia con el nuevo estado.
    ///
    /// No mira `request.expected`: esa comprobación corresponde a quien
    /// conoce el estado persistido.
    pub fn apply(&self, appointment: &Appointment, request: &TransitionRequest, now: DateTime<Utc>) -> Result<Appointment> {
        let from = appointment.status;
        let to = request.target;
        if !from.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition { from, to });
        }

        let mut next = appointment.clone();
        next.status = to;
        next.updated_at = now;
        match to {
            AppointmentStatus::Confirmed => next.confirmed_at = Some(now),
            AppointmentStatus::Cancelled => {
                next.cancellation_reason = Some(non_empty(request.reason.as_deref()).unwrap_or(DEFAULT_CANCELLATION_REASON)
                                                                                    .to_string())
            }
            AppointmentStatus::Completed => {
                if let Some(obs) = non_empty(request.observations.as_deref()) {
                    next.final_observations = Some(obs.to_string());
                }
            }
            _ => {}
        }
        Ok(next)
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;
    use vet_domain::{AppointmentKind, NewAppointment};

    fn scheduled() -> Appointment {
        NewAppointment { kind: AppointmentKind::Medical,
                         patient_id: Uuid::new_v4(),
                         resource_id: None,
                         service_type: None,
                         date: NaiveDate::from_ymd_opt(2030, 1, 2).unwrap(),
                         time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                         estimated_duration: None,
                         price: None,
                         notes: None,
                         cut_style: None }.into_appointment(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(), Utc::now())
                                          .unwrap()
    }

    #[test]
    fn confirm_stamps_confirmation_time() {
        let engine = LifecycleEngine::new();
        let now = Utc::now();
        let next = engine.apply(&scheduled(), &TransitionRequest::to(AppointmentStatus::Confirmed), now)
                         .unwrap();
        assert_eq!(next.status, AppointmentStatus::Confirmed);
        assert_eq!(next.confirmed_at, Some(now));
        assert_eq!(next.updated_at, now);
    }

    #[test]
    fn cancel_without_reason_uses_default() {
        let engine = LifecycleEngine::new();
        let req = TransitionRequest::to(AppointmentStatus::Cancelled).with_reason("   ");
        let next = engine.apply(&scheduled(), &req, Utc::now()).unwrap();
        assert_eq!(next.cancellation_reason.as_deref(), Some(DEFAULT_CANCELLATION_REASON));
    }

    #[test]
    fn illegal_target_leaves_input_untouched() {
        let engine = LifecycleEngine::new();
        let appt = scheduled();
        let err = engine.transition(&appt, AppointmentStatus::Completed).unwrap_err();
        assert_eq!(err,
                   LifecycleError::InvalidTransition { from: AppointmentStatus::Scheduled,
                                                       to: AppointmentStatus::Completed });
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
    }
}
