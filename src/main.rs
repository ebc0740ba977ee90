use mollyvet::{api::app_router, build_state, config::Config, init_tracing, scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    let state = build_state(&config).await?;

    if config.reminders_enabled {
        scheduler::start_reminder_scheduler(state.clone(), config.reminder_hour);
    } else {
        tracing::info!("Recordatorios desactivados (VET_REMINDERS_ENABLED)");
    }

    let router = app_router(state, &config);
    tracing::info!("Escuchando en {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
