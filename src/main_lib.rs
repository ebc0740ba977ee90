use std::sync::Arc;

use crate::config::Config;
use lifecycle::AppointmentService;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use vet_domain::ContactDirectory;
use vet_notify::{CalendarContext, EmailDispatcher};
use vet_persistence::DieselAppointmentRepository;

pub struct AppState {
    pub appointments: Arc<AppointmentService<DieselAppointmentRepository>>,
    pub contacts: Arc<dyn ContactDirectory>,
    pub dispatcher: Arc<EmailDispatcher>,
}

impl AppState {
    pub fn calendar(&self) -> &CalendarContext {
        self.dispatcher.calendar()
    }
}

/// Instala el suscriptor de `tracing`. `VET_LOG_FORMAT=json` cambia a
/// salida JSON; los registros de `log` de los crates también se capturan.
pub fn init_tracing() {
    let log_format = std::env::var("VET_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json().with_current_span(false)).init();
    } else {
        registry.with(fmt::layer().with_target(true).with_line_number(true)).init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let repo = Arc::new(vet_persistence::open_sqlite(&config.db_url)?);
    let contacts: Arc<dyn ContactDirectory> = repo.clone();
    let dispatcher = Arc::new(EmailDispatcher::from_config(&config.notify, contacts.clone())?);
    let appointments = Arc::new(AppointmentService::new(repo, dispatcher.clone()).with_contacts(contacts.clone()));
    Ok(Arc::new(AppState { appointments,
                           contacts,
                           dispatcher }))
}
