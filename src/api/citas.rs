use std::sync::Arc;

use crate::{
    api::blocking,
    error::{ApiError, ApiResult},
    main_lib::AppState,
    session::Session,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use chrono::{Local, NaiveDate, NaiveTime};
use lifecycle::{AppointmentFilter, StatusChange, TransitionRequest};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use vet_domain::{
    Appointment, AppointmentKind, AppointmentStats, AppointmentStatus, AppointmentUpdate, NewAppointment, StatsPeriod,
};
use vet_notify::{build_invite, CALENDAR_CONTENT_TYPE};

const DEFAULT_UPCOMING_LIMIT: usize = 10;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Cuerpo JSON opcional: vacío equivale a `T::default()`.
fn optional_body<T>(body: &Bytes) -> ApiResult<T>
    where T: DeserializeOwned + Default
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("JSON no válido: {}", e)))
}

/// Acepta `HH:MM` o `HH:MM:SS`.
fn parse_time(value: &str) -> ApiResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M:%S").or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M"))
                                                       .map_err(|_| ApiError::BadRequest(format!("Hora no válida: {}", value)))
}

#[derive(Deserialize, Default)]
struct ListQuery {
    fecha: Option<NaiveDate>,
    desde: Option<NaiveDate>,
    estado: Option<AppointmentStatus>,
    tipo: Option<AppointmentKind>,
    paciente: Option<Uuid>,
    recurso: Option<Uuid>,
}

#[derive(Deserialize)]
struct UpcomingQuery {
    desde: Option<NaiveDate>,
    limite: Option<usize>,
}

#[derive(Deserialize)]
struct StatsQuery {
    periodo: Option<String>,
}

#[derive(Deserialize)]
struct AvailabilityQuery {
    tipo: AppointmentKind,
    recurso: Uuid,
    fecha: NaiveDate,
    hora: Option<String>,
}

#[derive(Deserialize)]
struct RescheduleBody {
    #[serde(flatten)]
    update: AppointmentUpdate,
    #[serde(default)]
    estado_esperado: Option<AppointmentStatus>,
}

#[derive(Deserialize)]
struct TransitionBody {
    estado: AppointmentStatus,
    #[serde(default)]
    estado_esperado: Option<AppointmentStatus>,
    #[serde(default)]
    motivo: Option<String>,
    #[serde(default)]
    observaciones: Option<String>,
}

/// Cuerpo de las transiciones con nombre (`confirmar`, `cancelar`, ...).
#[derive(Deserialize, Default)]
struct ShortcutBody {
    #[serde(default)]
    estado_esperado: Option<AppointmentStatus>,
    #[serde(default)]
    motivo: Option<String>,
    #[serde(default)]
    observaciones: Option<String>,
}

#[derive(Serialize)]
struct TransitionsResponse {
    estado: AppointmentStatus,
    transiciones: Vec<AppointmentStatus>,
}

async fn create_appointment(State(state): State<Arc<AppState>>,
                            session: Session,
                            Json(request): Json<NewAppointment>)
                            -> ApiResult<(StatusCode, Json<Appointment>)> {
    let appointment = blocking(move || Ok(state.appointments.book(request, &session.user, today())?)).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn list_appointments(State(state): State<Arc<AppState>>,
                           Query(q): Query<ListQuery>)
                           -> ApiResult<Json<Vec<Appointment>>> {
    let filter = AppointmentFilter { date: q.fecha,
                                     from_date: q.desde,
                                     status: q.estado,
                                     kind: q.tipo,
                                     patient_id: q.paciente,
                                     resource_id: q.recurso };
    let appointments = blocking(move || Ok(state.appointments.list(&filter)?)).await?;
    Ok(Json(appointments))
}

async fn upcoming_appointments(State(state): State<Arc<AppState>>,
                               Query(q): Query<UpcomingQuery>)
                               -> ApiResult<Json<Vec<Appointment>>> {
    let from = q.desde.unwrap_or_else(today);
    let limit = q.limite.unwrap_or(DEFAULT_UPCOMING_LIMIT);
    let appointments = blocking(move || Ok(state.appointments.upcoming(from, limit)?)).await?;
    Ok(Json(appointments))
}

async fn appointment_stats(State(state): State<Arc<AppState>>,
                           Query(q): Query<StatsQuery>)
                           -> ApiResult<Json<AppointmentStats>> {
    let period = match q.periodo.as_deref() {
        Some(p) => p.parse::<StatsPeriod>()?,
        None => StatsPeriod::default(),
    };
    let stats = blocking(move || Ok(state.appointments.stats(period, today())?)).await?;
    Ok(Json(stats))
}

async fn check_availability(State(state): State<Arc<AppState>>,
                            Query(q): Query<AvailabilityQuery>)
                            -> ApiResult<Json<Value>> {
    let hora = q.hora
                .as_deref()
                .ok_or_else(|| ApiError::BadRequest("El parámetro hora es obligatorio".to_string()))?;
    let time = parse_time(hora)?;
    let available = blocking(move || Ok(state.appointments.is_available(q.tipo, &q.recurso, q.fecha, time)?)).await?;
    Ok(Json(json!({ "disponible": available })))
}

async fn available_slots(State(state): State<Arc<AppState>>,
                         Query(q): Query<AvailabilityQuery>)
                         -> ApiResult<Json<Value>> {
    let date = q.fecha;
    let slots = blocking(move || Ok(state.appointments.available_slots(q.tipo, &q.recurso, q.fecha)?)).await?;
    let horarios: Vec<String> = slots.iter().map(|t| t.format("%H:%M").to_string()).collect();
    Ok(Json(json!({ "fecha": date, "horarios": horarios })))
}

async fn get_appointment(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> ApiResult<Json<Appointment>> {
    let appointment = blocking(move || Ok(state.appointments.get(&id)?)).await?;
    Ok(Json(appointment))
}

async fn update_appointment(Path(id): Path<Uuid>,
                            State(state): State<Arc<AppState>>,
                            session: Session,
                            Json(body): Json<RescheduleBody>)
                            -> ApiResult<Json<Appointment>> {
    let saved = blocking(move || {
                    Ok(state.appointments
                            .reschedule(&id, &body.update, body.estado_esperado, &session.user, today())?)
                }).await?;
    Ok(Json(saved))
}

async fn delete_appointment(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    blocking(move || Ok(state.appointments.delete(&id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn legal_transitions(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> ApiResult<Json<TransitionsResponse>> {
    let response = blocking(move || {
                       let appointment = state.appointments.get(&id)?;
                       Ok(TransitionsResponse { estado: appointment.status,
                                                transiciones: state.appointments.legal_transitions(appointment.status) })
                   }).await?;
    Ok(Json(response))
}

async fn change_status(Path(id): Path<Uuid>,
                       State(state): State<Arc<AppState>>,
                       session: Session,
                       Json(body): Json<TransitionBody>)
                       -> ApiResult<Json<Appointment>> {
    let request = TransitionRequest { target: body.estado,
                                      expected: body.estado_esperado,
                                      reason: body.motivo,
                                      observations: body.observaciones };
    let saved = blocking(move || Ok(state.appointments.transition(&id, &request, &session.user)?)).await?;
    Ok(Json(saved))
}

async fn shortcut(state: Arc<AppState>,
                  id: Uuid,
                  target: AppointmentStatus,
                  session: Session,
                  body: &Bytes)
                  -> ApiResult<Json<Appointment>> {
    let body: ShortcutBody = optional_body(body)?;
    let request = TransitionRequest { target,
                                      expected: body.estado_esperado,
                                      reason: body.motivo,
                                      observations: body.observaciones };
    let saved = blocking(move || Ok(state.appointments.transition(&id, &request, &session.user)?)).await?;
    Ok(Json(saved))
}

async fn confirm(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>, session: Session, body: Bytes) -> ApiResult<Json<Appointment>> {
    shortcut(state, id, AppointmentStatus::Confirmed, session, &body).await
}

async fn start(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>, session: Session, body: Bytes) -> ApiResult<Json<Appointment>> {
    shortcut(state, id, AppointmentStatus::InProgress, session, &body).await
}

async fn complete(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>, session: Session, body: Bytes) -> ApiResult<Json<Appointment>> {
    shortcut(state, id, AppointmentStatus::Completed, session, &body).await
}

async fn cancel(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>, session: Session, body: Bytes) -> ApiResult<Json<Appointment>> {
    shortcut(state, id, AppointmentStatus::Cancelled, session, &body).await
}

async fn no_show(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>, session: Session, body: Bytes) -> ApiResult<Json<Appointment>> {
    shortcut(state, id, AppointmentStatus::NoShow, session, &body).await
}

async fn appointment_history(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<StatusChange>>> {
    let history = blocking(move || Ok(state.appointments.history(&id)?)).await?;
    Ok(Json(history))
}

async fn appointment_invite(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let file = blocking(move || {
                   let appointment = state.appointments.get(&id)?;
                   let contact = state.contacts.get_contact(&appointment.patient_id)?;
                   Ok(build_invite(&appointment, contact.as_ref(), state.calendar()))
               }).await?;
    Ok(([(header::CONTENT_TYPE, CALENDAR_CONTENT_TYPE.to_string()),
         (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file.filename))],
        file.content))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/citas", get(list_appointments).post(create_appointment))
                 .route("/citas/proximas", get(upcoming_appointments))
                 .route("/citas/estadisticas", get(appointment_stats))
                 .route("/citas/disponibilidad", get(check_availability))
                 .route("/citas/horarios-disponibles", get(available_slots))
                 .route("/citas/{id}",
                        get(get_appointment).put(update_appointment).delete(delete_appointment))
                 .route("/citas/{id}/transiciones", get(legal_transitions))
                 .route("/citas/{id}/estado", patch(change_status))
                 .route("/citas/{id}/confirmar", patch(confirm))
                 .route("/citas/{id}/iniciar", patch(start))
                 .route("/citas/{id}/completar", patch(complete))
                 .route("/citas/{id}/cancelar", patch(cancel))
                 .route("/citas/{id}/no-asistio", patch(no_show))
                 .route("/citas/{id}/historial", get(appointment_history))
                 .route("/citas/{id}/calendario", get(appointment_invite))
}
