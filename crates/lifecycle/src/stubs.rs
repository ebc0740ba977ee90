// Archivo: stubs.rs
// Propósito: implementaciones en memoria para pruebas y wiring rápido.
//
// Incluye un repositorio en memoria (`InMemoryAppointmentRepository`) y
// notificadores de prueba. No son durables.
use crate::domain::{AppointmentFilter, PersistResult, StatusChange};
use crate::errors::{LifecycleError, Result};
use crate::notifier::{Notifier, NotifyError};
use crate::repository::AppointmentRepository;
use crate::service::SLOT_TAKEN_MESSAGE;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;
use vet_domain::{Appointment, AppointmentKind, AppointmentStatus};

/// Repositorio en memoria. La comparación de estado en `save` se hace bajo
/// el mismo lock que la escritura.
pub struct InMemoryAppointmentRepository {
    appointments: Mutex<HashMap<Uuid, Appointment>>,
    /// Bitácora por cita, en orden de inserción.
    changes: Mutex<HashMap<Uuid, Vec<StatusChange>>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self { appointments: Mutex::new(HashMap::new()),
               changes: Mutex::new(HashMap::new()) }
    }

    /// Helper para mapear `Mutex::lock()` en un `Result` con
    /// `LifecycleError::Storage`.
    fn lock<'a, T>(&'a self, m: &'a Mutex<T>) -> std::result::Result<MutexGuard<'a, T>, LifecycleError> {
        m.lock().map_err(|e| LifecycleError::Storage(format!("mutex poisoned: {:?}", e)))
    }
}

/// `true` si otra cita activa ocupa el recurso, fecha y hora de `appointment`.
fn slot_taken(map: &HashMap<Uuid, Appointment>, appointment: &Appointment) -> bool {
    let Some(resource) = appointment.resource_id else {
        return false;
    };
    map.values()
       .any(|a| a.id != appointment.id && a.occupies(appointment.kind, resource, appointment.date, appointment.time))
}

impl Default for InMemoryAppointmentRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentRepository for InMemoryAppointmentRepository {
    fn load(&self, id: &Uuid) -> Result<Appointment> {
        let map = self.lock(&self.appointments)?;
        map.get(id).cloned().ok_or(LifecycleError::NotFound(format!("cita {}", id)))
    }

    fn insert(&self, appointment: &Appointment) -> Result<()> {
        let mut map = self.lock(&self.appointments)?;
        if map.contains_key(&appointment.id) {
            return Err(LifecycleError::Storage(format!("cita {} ya existe", appointment.id)));
        }
        map.insert(appointment.id, appointment.clone());
        Ok(())
    }

    fn insert_if_free(&self, appointment: &Appointment) -> Result<()> {
        let mut map = self.lock(&self.appointments)?;
        if map.contains_key(&appointment.id) {
            return Err(LifecycleError::Storage(format!("cita {} ya existe", appointment.id)));
        }
        if slot_taken(&map, appointment) {
            return Err(LifecycleError::SlotTaken(SLOT_TAKEN_MESSAGE.to_string()));
        }
        map.insert(appointment.id, appointment.clone());
        Ok(())
    }

    fn save(&self, appointment: &Appointment, expected_status: AppointmentStatus) -> Result<PersistResult> {
        let mut map = self.lock(&self.appointments)?;
        let stored = map.get_mut(&appointment.id)
                        .ok_or(LifecycleError::NotFound(format!("cita {}", appointment.id)))?;
        if stored.status != expected_status {
            return Ok(PersistResult::Conflict { actual: stored.status });
        }
        *stored = appointment.clone();
        Ok(PersistResult::Ok { appointment: appointment.clone() })
    }

    fn save_rescheduled(&self,
                        appointment: &Appointment,
                        expected_status: AppointmentStatus,
                        expected_updated_at: DateTime<Utc>)
                        -> Result<PersistResult> {
        let mut map = self.lock(&self.appointments)?;
        let stored = map.get(&appointment.id)
                        .ok_or(LifecycleError::NotFound(format!("cita {}", appointment.id)))?;
        if stored.status != expected_status || stored.updated_at != expected_updated_at {
            return Ok(PersistResult::Conflict { actual: stored.status });
        }
        let moved = stored.date != appointment.date
                    || stored.time != appointment.time
                    || stored.resource_id != appointment.resource_id;
        if moved && slot_taken(&map, appointment) {
            return Err(LifecycleError::SlotTaken(SLOT_TAKEN_MESSAGE.to_string()));
        }
        map.insert(appointment.id, appointment.clone());
        Ok(PersistResult::Ok { appointment: appointment.clone() })
    }

    fn delete(&self, id: &Uuid) -> Result<()> {
        let removed = self.lock(&self.appointments)?.remove(id);
        if removed.is_none() {
            return Err(LifecycleError::NotFound(format!("cita {}", id)));
        }
        self.lock(&self.changes)?.remove(id);
        Ok(())
    }

    fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let map = self.lock(&self.appointments)?;
        let mut out: Vec<Appointment> = map.values().filter(|a| filter.matches(a)).cloned().collect();
        out.sort_by(|a, b| a.date.cmp(&b.date).then(a.time.cmp(&b.time)));
        Ok(out)
    }

    fn occupied_times(&self, kind: AppointmentKind, resource_id: &Uuid, date: NaiveDate) -> Result<Vec<NaiveTime>> {
        let map = self.lock(&self.appointments)?;
        let mut times: Vec<NaiveTime> = map.values()
                                           .filter(|a| a.occupies(kind, *resource_id, date, a.time))
                                           .map(|a| a.time)
                                           .collect();
        times.sort();
        times.dedup();
        Ok(times)
    }

    fn record_change(&self, change: &StatusChange) -> Result<()> {
        let mut changes = self.lock(&self.changes)?;
        changes.entry(change.appointment_id).or_default().push(change.clone());
        Ok(())
    }

    fn history(&self, appointment_id: &Uuid) -> Result<Vec<StatusChange>> {
        let changes = self.lock(&self.changes)?;
        Ok(changes.get(appointment_id).cloned().unwrap_or_default())
    }

    fn mark_reminder_sent(&self, id: &Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut map = self.lock(&self.appointments)?;
        let stored = map.get_mut(id).ok_or(LifecycleError::NotFound(format!("cita {}", id)))?;
        stored.reminder_sent_at = Some(at);
        Ok(())
    }
}

/// Notificador que no hace nada.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn send_confirmation(&self, _appointment: &Appointment) -> std::result::Result<(), NotifyError> {
        Ok(())
    }
}

/// Notificador que guarda los ids recibidos. Con `failing()` registra el
/// intento y devuelve error.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Uuid>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { sent: Mutex::new(Vec::new()),
               fail: true }
    }

    /// Ids de las citas para las que se pidió confirmación.
    pub fn sent(&self) -> Vec<Uuid> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Notifier for RecordingNotifier {
    fn send_confirmation(&self, appointment: &Appointment) -> std::result::Result<(), NotifyError> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(appointment.id);
        if self.fail {
            return Err(NotifyError::Delivery("fallo simulado".to_string()));
        }
        Ok(())
    }
}
