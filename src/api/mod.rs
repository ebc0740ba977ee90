use std::sync::Arc;

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{http::HeaderValue, Router};
use tokio::task;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod citas;
pub mod health;
pub mod pacientes;

/// Ejecuta `f` en el pool bloqueante de tokio. Diesel y r2d2 bloquean el
/// hilo, así que los handlers no llaman al servicio de citas directamente.
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
    where F: FnOnce() -> ApiResult<T> + Send + 'static,
          T: Send + 'static
{
    task::spawn_blocking(f).await
                           .map_err(|e| ApiError::Internal(format!("tarea interrumpida: {}", e)))?
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config.cors_allow
                            .iter()
                            .filter_map(|o| match o.parse::<HeaderValue>() {
                                Ok(v) => Some(v),
                                Err(_) => {
                                    tracing::warn!("Origen CORS ignorado: {}", o);
                                    None
                                }
                            })
                            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };
    let cors = cors.allow_methods(Any).allow_headers(Any);

    let api = Router::new().merge(health::router())
                           .merge(citas::router())
                           .merge(pacientes::router());

    Router::new().nest("/api", api)
                 .layer(cors)
                 .layer(TraceLayer::new_for_http())
                 .with_state(state)
}
