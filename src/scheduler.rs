//! Tarea diaria de recordatorios.
//!
//! Se ejecuta una vez al día a la hora local configurada y envía los
//! recordatorios de las citas del día siguiente. Las consultas a la base
//! corren en el pool bloqueante de tokio (ver `send_due_reminders`).

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::main_lib::AppState;

pub fn start_reminder_scheduler(state: Arc<AppState>, hour: u32) {
    tokio::spawn(async move {
        info!("Recordatorios programados a las {:02}:00", hour);
        loop {
            let wait = until_next_run(Local::now().naive_local(), hour);
            tokio::time::sleep(wait).await;
            run_reminders(&state).await;
        }
    });
}

/// Ejecuta una pasada de recordatorios para hoy.
pub async fn run_reminders(state: &Arc<AppState>) {
    let today = Local::now().date_naive();
    match vet_notify::send_due_reminders(&state.appointments, &state.dispatcher, today).await {
        Ok(summary) => info!("Recordatorios: {} enviados, {} omitidos, {} fallidos",
                             summary.sent, summary.skipped, summary.failed),
        Err(e) => warn!("No se pudieron listar los recordatorios: {}", e),
    }
}

/// Tiempo hasta la próxima `hour:00` local, estrictamente en el futuro.
fn until_next_run(now: NaiveDateTime, hour: u32) -> Duration {
    let at = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut next = now.date().and_time(at);
    if next <= now {
        next += ChronoDuration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 6, 10).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn next_run_is_today_or_tomorrow() {
        assert_eq!(until_next_run(at(7, 30), 9), Duration::from_secs(90 * 60));
        assert_eq!(until_next_run(at(9, 0), 9), Duration::from_secs(24 * 60 * 60));
        assert_eq!(until_next_run(at(10, 0), 9), Duration::from_secs(23 * 60 * 60));
    }
}
