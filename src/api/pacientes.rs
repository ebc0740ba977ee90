use std::sync::Arc;

use crate::{
    api::blocking,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use lifecycle::AppointmentFilter;
use uuid::Uuid;
use vet_domain::PatientContact;
use vet_notify::build_calendar;

async fn upsert_patient(State(state): State<Arc<AppState>>,
                        Json(contact): Json<PatientContact>)
                        -> ApiResult<Json<PatientContact>> {
    let saved = blocking(move || Ok(state.contacts.upsert_contact(contact)?)).await?;
    Ok(Json(saved))
}

async fn get_patient(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> ApiResult<Json<PatientContact>> {
    let contact = blocking(move || Ok(state.contacts.get_contact(&id)?)).await?;
    contact.map(Json)
           .ok_or_else(|| ApiError::NotFound(format!("Paciente {} no encontrado", id)))
}

/// Todas las citas pendientes del paciente en un único .ics.
async fn patient_calendar(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let file = blocking(move || {
                   let contact = state.contacts.get_contact(&id)?;
                   let filter = AppointmentFilter { patient_id: Some(id),
                                                    ..Default::default() };
                   let items: Vec<_> = state.appointments
                                            .list(&filter)?
                                            .into_iter()
                                            .filter(|a| a.status.is_pending())
                                            .map(|a| (a, contact.clone()))
                                            .collect();
                   Ok(build_calendar(&items, state.calendar()))
               }).await?;
    Ok(([(header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
         (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file.filename))],
        file.content))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/pacientes", post(upsert_patient))
                 .route("/pacientes/{id}", get(get_patient))
                 .route("/pacientes/{id}/calendario", get(patient_calendar))
}
