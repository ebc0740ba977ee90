// Archivo: service.rs
// Propósito: implementar `AppointmentService`, la capa orquestadora que
// combina repositorio, motor de transiciones y notificador. Es lo que
// invocan los handlers HTTP y el job de recordatorios.
use crate::domain::{AppointmentFilter, ChangeAction, PersistResult, StatusChange, TransitionRequest};
use crate::engine::LifecycleEngine;
use crate::errors::{LifecycleError, Result};
use crate::notifier::Notifier;
use crate::repository::AppointmentRepository;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use vet_domain::{Appointment, AppointmentKind, AppointmentStats, AppointmentStatus, AppointmentUpdate, ContactDirectory,
                 NewAppointment, SlotGrid, StatsPeriod};

/// Mensaje devuelto cuando el horario ya está tomado.
pub const SLOT_TAKEN_MESSAGE: &str = "Ya existe una cita programada en ese horario";

/// Mensaje devuelto al reservar para un paciente que no está registrado.
pub const PATIENT_NOT_FOUND_MESSAGE: &str = "Paciente no encontrado";

/// Servicio de alto nivel sobre citas.
///
/// Orden de una transición: carga, comprobación del estado esperado,
/// validación del destino, escritura condicionada al estado leído,
/// bitácora y, si el destino es `confirmada`, notificación. Nada se escribe
/// ni se notifica si la validación falla.
pub struct AppointmentService<R> where R: AppointmentRepository
{
    repo: Arc<R>,
    notifier: Arc<dyn Notifier>,
    /// Si está presente, `book` exige que el paciente exista.
    contacts: Option<Arc<dyn ContactDirectory>>,
    engine: LifecycleEngine,
    grid: SlotGrid,
}

impl<R> AppointmentService<R> where R: AppointmentRepository
{
    pub fn new(repo: Arc<R>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repo,
               notifier,
               contacts: None,
               engine: LifecycleEngine::new(),
               grid: SlotGrid::default() }
    }

    /// Sustituye la rejilla de horarios (por defecto 08:00-18:00 cada 30 min).
    pub fn with_grid(mut self, grid: SlotGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Directorio de pacientes contra el que se validan las reservas.
    pub fn with_contacts(mut self, contacts: Arc<dyn ContactDirectory>) -> Self {
        self.contacts = Some(contacts);
        self
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Reserva una cita nueva en estado `programada`.
    pub fn book(&self, request: NewAppointment, actor: &str, today: NaiveDate) -> Result<Appointment> {
        let now = Utc::now();
        let appointment = request.into_appointment(today, now)?;
        if let Some(contacts) = &self.contacts {
            if contacts.get_contact(&appointment.patient_id)?.is_none() {
                return Err(LifecycleError::NotFound(PATIENT_NOT_FOUND_MESSAGE.to_string()));
            }
        }
        self.repo.insert_if_free(&appointment)?;
        self.audit(&appointment, ChangeAction::Creada, None, actor, None, now);
        log::info!("cita {} creada ({} {} {})",
                   appointment.id, appointment.kind, appointment.date, appointment.time);
        Ok(appointment)
    }

    pub fn get(&self, id: &Uuid) -> Result<Appointment> {
        self.repo.load(id)
    }

    pub fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        self.repo.list(filter)
    }

    /// Citas pendientes (`programada`/`confirmada`) desde `from`, en orden.
    pub fn upcoming(&self, from: NaiveDate, limit: usize) -> Result<Vec<Appointment>> {
        let filter = AppointmentFilter { from_date: Some(from),
                                         ..Default::default() };
        Ok(self.repo
               .list(&filter)?
               .into_iter()
               .filter(|a| a.status.is_pending())
               .take(limit)
               .collect())
    }

    pub fn delete(&self, id: &Uuid) -> Result<()> {
        self.repo.load(id)?;
        self.repo.delete(id)?;
        log::info!("cita {} eliminada", id);
        Ok(())
    }

    /// Sucesores legales de un estado; sin efectos.
    pub fn legal_transitions(&self, status: AppointmentStatus) -> Vec<AppointmentStatus> {
        self.engine.legal_transitions(status)
    }

    /// Sucesores legales del estado persistido de la cita.
    pub fn legal_transitions_for(&self, id: &Uuid) -> Result<Vec<AppointmentStatus>> {
        let current = self.repo.load(id)?;
        Ok(self.engine.legal_transitions(current.status))
    }

    /// Aplica una transición de estado.
    pub fn transition(&self, id: &Uuid, request: &TransitionRequest, actor: &str) -> Result<Appointment> {
        let current = self.repo.load(id)?;
        if let Some(expected) = request.expected {
            if expected != current.status {
                return Err(LifecycleError::ConflictingTransition { expected,
                                                                   actual: current.status });
            }
        }

        let now = Utc::now();
        let next = self.engine.apply(&current, request, now)?;
        let saved = match self.repo.save(&next, current.status)? {
            PersistResult::Ok { appointment } => appointment,
            PersistResult::Conflict { actual } => {
                return Err(LifecycleError::ConflictingTransition { expected: request.expected.unwrap_or(current.status),
                                                                   actual })
            }
        };

        let detail = match saved.status {
            AppointmentStatus::Cancelled => saved.cancellation_reason.clone(),
            AppointmentStatus::Completed => saved.final_observations.clone(),
            _ => None,
        };
        self.audit(&saved, ChangeAction::CambioEstado, Some(current.status), actor, detail, now);
        log::info!("cita {}: {} -> {} ({})", saved.id, current.status, saved.status, actor);

        if saved.status == AppointmentStatus::Confirmed {
            if let Err(e) = self.notifier.send_confirmation(&saved) {
                log::warn!("no se pudo solicitar la confirmación de la cita {}: {}", saved.id, e);
            }
        }
        Ok(saved)
    }

    pub fn confirm(&self, id: &Uuid, actor: &str) -> Result<Appointment> {
        self.transition(id, &TransitionRequest::to(AppointmentStatus::Confirmed), actor)
    }

    pub fn start(&self, id: &Uuid, actor: &str) -> Result<Appointment> {
        self.transition(id, &TransitionRequest::to(AppointmentStatus::InProgress), actor)
    }

    pub fn complete(&self, id: &Uuid, observations: Option<String>, actor: &str) -> Result<Appointment> {
        let request = TransitionRequest { observations,
                                          ..TransitionRequest::to(AppointmentStatus::Completed) };
        self.transition(id, &request, actor)
    }

    pub fn cancel(&self, id: &Uuid, reason: Option<String>, actor: &str) -> Result<Appointment> {
        let request = TransitionRequest { reason,
                                          ..TransitionRequest::to(AppointmentStatus::Cancelled) };
        self.transition(id, &request, actor)
    }

    pub fn mark_no_show(&self, id: &Uuid, actor: &str) -> Result<Appointment> {
        self.transition(id, &TransitionRequest::to(AppointmentStatus::NoShow), actor)
    }

    /// Reprograma o modifica una cita no terminal.
    ///
    /// Si cambia fecha, hora o recurso el repositorio vuelve a comprobar el
    /// horario al escribir. La escritura se condiciona al estado y a
    /// `updated_at` leídos, así que una modificación concurrente devuelve
    /// `ConflictingTransition` en lugar de pisarse.
    pub fn reschedule(&self,
                      id: &Uuid,
                      update: &AppointmentUpdate,
                      expected: Option<AppointmentStatus>,
                      actor: &str,
                      today: NaiveDate)
                      -> Result<Appointment> {
        let current = self.repo.load(id)?;
        if let Some(expected) = expected {
            if expected != current.status {
                return Err(LifecycleError::ConflictingTransition { expected,
                                                                   actual: current.status });
            }
        }
        let now = Utc::now();
        let next = update.apply_to(&current, today, now)?;
        let saved = match self.repo.save_rescheduled(&next, current.status, current.updated_at)? {
            PersistResult::Ok { appointment } => appointment,
            PersistResult::Conflict { actual } => {
                return Err(LifecycleError::ConflictingTransition { expected: expected.unwrap_or(current.status),
                                                                   actual })
            }
        };
        if update.moves_slot(&current) {
            let detail = format!("{} {} -> {} {}", current.date, current.time, saved.date, saved.time);
            self.audit(&saved, ChangeAction::Reprogramada, Some(current.status), actor, Some(detail), now);
        }
        Ok(saved)
    }

    /// `true` si el recurso no tiene otra cita activa en ese horario.
    pub fn is_available(&self, kind: AppointmentKind, resource_id: &Uuid, date: NaiveDate, time: NaiveTime) -> Result<bool> {
        let occupied = self.repo.occupied_times(kind, resource_id, date)?;
        Ok(!occupied.contains(&time))
    }

    /// Horarios libres de la rejilla para un recurso y fecha.
    pub fn available_slots(&self, kind: AppointmentKind, resource_id: &Uuid, date: NaiveDate) -> Result<Vec<NaiveTime>> {
        let occupied = self.repo.occupied_times(kind, resource_id, date)?;
        Ok(self.grid.available(&occupied))
    }

    pub fn stats(&self, period: StatsPeriod, today: NaiveDate) -> Result<AppointmentStats> {
        let filter = AppointmentFilter { from_date: Some(period.start_date(today)),
                                         ..Default::default() };
        let appointments = self.repo.list(&filter)?;
        Ok(AppointmentStats::collect(&appointments, period, today))
    }

    pub fn history(&self, id: &Uuid) -> Result<Vec<StatusChange>> {
        self.repo.load(id)?;
        self.repo.history(id)
    }

    /// Citas de `date` pendientes y sin recordatorio enviado.
    pub fn pending_reminders(&self, date: NaiveDate) -> Result<Vec<Appointment>> {
        let filter = AppointmentFilter { date: Some(date),
                                         ..Default::default() };
        Ok(self.repo
               .list(&filter)?
               .into_iter()
               .filter(|a| a.status.is_pending() && a.reminder_sent_at.is_none())
               .collect())
    }

    pub fn mark_reminder_sent(&self, id: &Uuid, at: DateTime<Utc>) -> Result<()> {
        self.repo.mark_reminder_sent(id, at)
    }

    /// La bitácora no forma parte de la escritura condicionada: si falla se
    /// registra el error y el cambio ya aplicado se mantiene.
    fn audit(&self,
             appointment: &Appointment,
             action: ChangeAction,
             from: Option<AppointmentStatus>,
             actor: &str,
             detail: Option<String>,
             at: DateTime<Utc>) {
        let change = StatusChange { id: Uuid::new_v4(),
                                    appointment_id: appointment.id,
                                    action,
                                    from,
                                    to: appointment.status,
                                    actor: actor.to_string(),
                                    detail,
                                    at };
        if let Err(e) = self.repo.record_change(&change) {
            log::warn!("no se pudo registrar la bitácora de la cita {}: {}", appointment.id, e);
        }
    }
}
