// Archivo: reminders.rs
// Propósito: una pasada del job de recordatorios: citas de mañana,
// pendientes y sin recordatorio, con email del propietario.
use crate::dispatcher::EmailDispatcher;
use chrono::{Duration, NaiveDate, Utc};
use lifecycle::{AppointmentRepository, AppointmentService, LifecycleError, NotifyError};
use std::sync::Arc;

/// Resultado de una pasada.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Envía los recordatorios de las citas de `today + 1`.
///
/// Los fallos por cita se registran y no detienen la pasada; sólo un fallo al
/// listar las citas aborta. Las llamadas al repositorio corren en el pool
/// bloqueante de tokio.
pub async fn send_due_reminders<R>(service: &Arc<AppointmentService<R>>,
                                   dispatcher: &EmailDispatcher,
                                   today: NaiveDate)
                                   -> Result<ReminderSummary, LifecycleError>
    where R: AppointmentRepository + 'static
{
    let tomorrow = today + Duration::days(1);
    let due = off_runtime(service, move |s| s.pending_reminders(tomorrow)).await?;
    log::info!("recordatorios: {} citas para {}", due.len(), tomorrow);

    let mut summary = ReminderSummary::default();
    for appointment in &due {
        match dispatcher.send_reminder(appointment, today).await {
            Ok(()) => {
                let id = appointment.id;
                match off_runtime(service, move |s| s.mark_reminder_sent(&id, Utc::now())).await {
                    Ok(()) => summary.sent += 1,
                    Err(e) => {
                        log::warn!("recordatorio de la cita {} enviado pero no marcado: {}", appointment.id, e);
                        summary.failed += 1;
                    }
                }
            }
            Err(NotifyError::MissingRecipient(who)) => {
                log::debug!("cita {} sin destinatario: {}", appointment.id, who);
                summary.skipped += 1;
            }
            Err(e) => {
                log::warn!("falló el recordatorio de la cita {}: {}", appointment.id, e);
                summary.failed += 1;
            }
        }
    }
    log::info!("recordatorios: {} enviados, {} omitidos, {} fallidos",
               summary.sent, summary.skipped, summary.failed);
    Ok(summary)
}

async fn off_runtime<R, T, F>(service: &Arc<AppointmentService<R>>, f: F) -> Result<T, LifecycleError>
    where R: AppointmentRepository + 'static,
          T: Send + 'static,
          F: FnOnce(&AppointmentService<R>) -> Result<T, LifecycleError> + Send + 'static
{
    let service = service.clone();
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| LifecycleError::Storage(format!("tarea de repositorio interrumpida: {}", e)))?
}
