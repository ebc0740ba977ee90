use crate::schema;
use crate::schema::cita_historial::dsl as hist_dsl;
use crate::schema::citas;
use crate::schema::pacientes::dsl as pac_dsl;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use lifecycle::{AppointmentFilter, AppointmentRepository, ChangeAction, LifecycleError, PersistResult, StatusChange,
                SLOT_TAKEN_MESSAGE};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;
use vet_domain::{Appointment, AppointmentKind, AppointmentStatus, ContactDirectory, DomainError, PatientContact,
                 ServiceType};
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = SqliteConnection;
const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";
/// Repo Diesel que implementa `AppointmentRepository` y `ContactDirectory`.
pub struct DieselAppointmentRepository {
  pool: Arc<DbPool>,
}
impl DieselAppointmentRepository {
  /// Abre (o crea) la base SQLite y aplica las migraciones pendientes.
  pub fn new(database_url: &str) -> Result<Self, LifecycleError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder().max_size(4)
                              .connection_customizer(Box::new(ConnectionCustomizer))
                              .build(manager)
                              .map_err(|e| LifecycleError::Storage(format!("no se pudo crear el pool de conexiones: {}", e)))?;
    let repo = DieselAppointmentRepository { pool: Arc::new(pool) };
    let mut c = repo.conn()?;
    if let Err(e) = diesel::sql_query("PRAGMA journal_mode = WAL;").execute(&mut c) {
      log::warn!("PRAGMA journal_mode = WAL falló: {}", e);
    }
    c.run_pending_migrations(MIGRATIONS)
     .map_err(|e| LifecycleError::Storage(format!("migraciones: {}", e)))?;
    Ok(repo)
  }
  fn conn(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>, LifecycleError> {
    self.pool.get().map_err(|e| LifecycleError::Storage(format!("pool: {}", e)))
  }
}
/// `busy_timeout` es por conexión: cada conexión del pool espera al lock de
/// escritura en lugar de fallar con `SQLITE_BUSY`.
#[derive(Debug)]
struct ConnectionCustomizer;
impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionCustomizer {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
    conn.batch_execute("PRAGMA busy_timeout = 5000;")
        .map_err(diesel::r2d2::Error::QueryError)
  }
}
// Filas Diesel
#[derive(Debug, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = schema::citas, treat_none_as_null = true)]
struct CitaRow {
  pub id: String,
  pub kind: String,
  pub patient_id: String,
  pub resource_id: Option<String>,
  pub service: String,
  pub date: String,
  pub time: String,
  pub status: String,
  pub estimated_duration: Option<i32>,
  pub price: Option<String>,
  pub notes: Option<String>,
  pub cut_style: Option<String>,
  pub cancellation_reason: Option<String>,
  pub final_observations: Option<String>,
  pub confirmed_at: Option<String>,
  pub reminder_sent_at: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::cita_historial)]
struct HistorialRow {
  pub id: String,
  pub cita_id: String,
  pub seq: i64,
  pub action: String,
  pub from_status: Option<String>,
  pub to_status: String,
  pub actor: String,
  pub detail: Option<String>,
  pub at: String,
}
#[derive(Debug, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = schema::pacientes, primary_key(patient_id), treat_none_as_null = true)]
struct PacienteRow {
  pub patient_id: String,
  pub pet_name: String,
  pub owner_name: String,
  pub owner_email: Option<String>,
  pub species: Option<String>,
}
fn map_db_err<T>(res: std::result::Result<T, DieselError>) -> Result<T, LifecycleError> {
  res.map_err(|e| LifecycleError::Storage(format!("db: {}", e)))
}
fn corrupt(what: &str, value: &str) -> LifecycleError {
  LifecycleError::Storage(format!("valor inválido en {}: {}", what, value))
}
fn ts_to_text(ts: DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
fn text_to_ts(s: &str) -> Result<DateTime<Utc>, LifecycleError> {
  DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc))
                                 .map_err(|_| corrupt("timestamp", s))
}
fn parse_uuid(s: &str) -> Result<Uuid, LifecycleError> {
  Uuid::parse_str(s).map_err(|_| corrupt("uuid", s))
}
fn status_from(s: &str) -> Result<AppointmentStatus, LifecycleError> {
  AppointmentStatus::from_str(s).map_err(|_| corrupt("estado", s))
}
impl CitaRow {
  fn from_appointment(a: &Appointment) -> Result<Self, LifecycleError> {
    let estimated_duration = match a.estimated_duration {
      Some(d) => Some(i32::try_from(d).map_err(|_| {
                                        LifecycleError::Validation(format!("duración estimada fuera de rango: {}", d))
                                      })?),
      None => None,
    };
    Ok(CitaRow { id: a.id.to_string(),
              kind: a.kind.as_str().to_string(),
              patient_id: a.patient_id.to_string(),
              resource_id: a.resource_id.map(|r| r.to_string()),
              service: a.service.as_str().to_string(),
              date: a.date.format(DATE_FMT).to_string(),
              time: a.time.format(TIME_FMT).to_string(),
              status: a.status.as_str().to_string(),
              estimated_duration,
              price: a.price.map(|p| p.to_string()),
              notes: a.notes.clone(),
              cut_style: a.cut_style.clone(),
              cancellation_reason: a.cancellation_reason.clone(),
              final_observations: a.final_observations.clone(),
              confirmed_at: a.confirmed_at.map(ts_to_text),
              reminder_sent_at: a.reminder_sent_at.map(ts_to_text),
              created_at: ts_to_text(a.created_at),
              updated_at: ts_to_text(a.updated_at) })
  }
  fn into_appointment(self) -> Result<Appointment, LifecycleError> {
    let kind = AppointmentKind::from_str(&self.kind).map_err(|_| corrupt("tipo", &self.kind))?;
    let service = ServiceType::parse_for(kind, &self.service).map_err(|_| corrupt("servicio", &self.service))?;
    let price = match self.price {
      Some(p) => Some(Decimal::from_str(&p).map_err(|_| corrupt("precio", &p))?),
      None => None,
    };
    let estimated_duration = match self.estimated_duration {
      Some(d) => Some(u32::try_from(d).map_err(|_| corrupt("duración", &d.to_string()))?),
      None => None,
    };
    Ok(Appointment { id: parse_uuid(&self.id)?,
                     kind,
                     patient_id: parse_uuid(&self.patient_id)?,
                     resource_id: self.resource_id.as_deref().map(parse_uuid).transpose()?,
                     service,
                     date: NaiveDate::parse_from_str(&self.date, DATE_FMT).map_err(|_| corrupt("fecha", &self.date))?,
                     time: NaiveTime::parse_from_str(&self.time, TIME_FMT).map_err(|_| corrupt("hora", &self.time))?,
                     status: status_from(&self.status)?,
                     estimated_duration,
                     price,
                     notes: self.notes,
                     cut_style: self.cut_style,
                     cancellation_reason: self.cancellation_reason,
                     final_observations: self.final_observations,
                     confirmed_at: self.confirmed_at.as_deref().map(text_to_ts).transpose()?,
                     reminder_sent_at: self.reminder_sent_at.as_deref().map(text_to_ts).transpose()?,
                     created_at: text_to_ts(&self.created_at)?,
                     updated_at: text_to_ts(&self.updated_at)? })
  }
}
impl HistorialRow {
  fn into_change(self) -> Result<StatusChange, LifecycleError> {
    Ok(StatusChange { id: parse_uuid(&self.id)?,
                      appointment_id: parse_uuid(&self.cita_id)?,
                      action: ChangeAction::parse(&self.action).ok_or_else(|| corrupt("acción", &self.action))?,
                      from: self.from_status.as_deref().map(status_from).transpose()?,
                      to: status_from(&self.to_status)?,
                      actor: self.actor,
                      detail: self.detail,
                      at: text_to_ts(&self.at)? })
  }
}
/// Otra cita activa del mismo tipo ocupa el recurso, fecha y hora de `row`.
fn slot_taken(c: &mut DbConn, row: &CitaRow) -> QueryResult<bool> {
  let Some(resource) = row.resource_id.as_deref() else {
    return Ok(false);
  };
  let released = [AppointmentStatus::Cancelled.as_str(), AppointmentStatus::NoShow.as_str()];
  let n: i64 = citas::table.filter(citas::kind.eq(&row.kind))
                           .filter(citas::resource_id.eq(resource))
                           .filter(citas::date.eq(&row.date))
                           .filter(citas::time.eq(&row.time))
                           .filter(citas::status.ne_all(released))
                           .filter(citas::id.ne(&row.id))
                           .count()
                           .get_result(c)?;
  Ok(n > 0)
}
enum RescheduleOutcome {
  Saved,
  Missing,
  Conflict(String),
  SlotTaken,
}
impl AppointmentRepository for DieselAppointmentRepository {
  fn load(&self, id: &Uuid) -> Result<Appointment, LifecycleError> {
    let mut conn = self.conn()?;
    let row = map_db_err(citas::table.filter(citas::id.eq(id.to_string()))
                                     .first::<CitaRow>(&mut conn)
                                     .optional())?;
    match row {
      Some(r) => r.into_appointment(),
      None => Err(LifecycleError::NotFound(format!("cita {}", id))),
    }
  }
  fn insert(&self, appointment: &Appointment) -> Result<(), LifecycleError> {
    let mut conn = self.conn()?;
    let row = CitaRow::from_appointment(appointment)?;
    map_db_err(diesel::insert_into(citas::table).values(&row).execute(&mut conn))?;
    Ok(())
  }
  /// Comprobación e INSERT dentro de una transacción `IMMEDIATE`: SQLite
  /// toma el lock de escritura al empezar, así que otra reserva espera.
  fn insert_if_free(&self, appointment: &Appointment) -> Result<(), LifecycleError> {
    let row = CitaRow::from_appointment(appointment)?;
    let mut conn = self.conn()?;
    let inserted = map_db_err(conn.immediate_transaction::<_, DieselError, _>(|c| {
                                    if slot_taken(c, &row)? {
                                      return Ok(false);
                                    }
                                    diesel::insert_into(citas::table).values(&row).execute(c)?;
                                    Ok(true)
                                  }))?;
    if !inserted {
      return Err(LifecycleError::SlotTaken(SLOT_TAKEN_MESSAGE.to_string()));
    }
    Ok(())
  }
  /// UPDATE condicionado al estado: `WHERE id = ? AND status = ?`. Si no
  /// afecta filas se distingue entre cita inexistente y conflicto.
  fn save(&self, appointment: &Appointment, expected_status: AppointmentStatus) -> Result<PersistResult, LifecycleError> {
    let row = CitaRow::from_appointment(appointment)?;
    let mut conn = self.conn()?;
    let updated = map_db_err(diesel::update(citas::table.filter(citas::id.eq(&row.id))
                                                        .filter(citas::status.eq(expected_status.as_str())))
                             .set(&row)
                             .execute(&mut conn))?;
    if updated == 1 {
      return Ok(PersistResult::Ok { appointment: appointment.clone() });
    }
    let current = map_db_err(citas::table.filter(citas::id.eq(&row.id))
                                         .select(citas::status)
                                         .first::<String>(&mut conn)
                                         .optional())?;
    match current {
      Some(s) => Ok(PersistResult::Conflict { actual: status_from(&s)? }),
      None => Err(LifecycleError::NotFound(format!("cita {}", appointment.id))),
    }
  }
  /// Relee la fila dentro de una transacción `IMMEDIATE` y compara estado y
  /// `updated_at` antes de comprobar el horario y escribir.
  fn save_rescheduled(&self,
                      appointment: &Appointment,
                      expected_status: AppointmentStatus,
                      expected_updated_at: DateTime<Utc>)
                      -> Result<PersistResult, LifecycleError> {
    let row = CitaRow::from_appointment(appointment)?;
    let expected_ts = ts_to_text(expected_updated_at);
    let mut conn = self.conn()?;
    let outcome = map_db_err(conn.immediate_transaction::<_, DieselError, _>(|c| {
                                   let stored = citas::table.filter(citas::id.eq(&row.id))
                                                            .first::<CitaRow>(c)
                                                            .optional()?;
                                   let Some(stored) = stored else {
                                     return Ok(RescheduleOutcome::Missing);
                                   };
                                   if stored.status != expected_status.as_str() || stored.updated_at != expected_ts {
                                     return Ok(RescheduleOutcome::Conflict(stored.status));
                                   }
                                   let moved = stored.date != row.date
                                               || stored.time != row.time
                                               || stored.resource_id != row.resource_id;
                                   if moved && slot_taken(c, &row)? {
                                     return Ok(RescheduleOutcome::SlotTaken);
                                   }
                                   diesel::update(citas::table.filter(citas::id.eq(&row.id))).set(&row).execute(c)?;
                                   Ok(RescheduleOutcome::Saved)
                                 }))?;
    match outcome {
      RescheduleOutcome::Saved => Ok(PersistResult::Ok { appointment: appointment.clone() }),
      RescheduleOutcome::Conflict(s) => Ok(PersistResult::Conflict { actual: status_from(&s)? }),
      RescheduleOutcome::SlotTaken => Err(LifecycleError::SlotTaken(SLOT_TAKEN_MESSAGE.to_string())),
      RescheduleOutcome::Missing => Err(LifecycleError::NotFound(format!("cita {}", appointment.id))),
    }
  }
  fn delete(&self, id: &Uuid) -> Result<(), LifecycleError> {
    let mut conn = self.conn()?;
    let id_s = id.to_string();
    let n = map_db_err(conn.transaction::<_, DieselError, _>(|c| {
                             diesel::delete(hist_dsl::cita_historial.filter(hist_dsl::cita_id.eq(&id_s))).execute(c)?;
                             diesel::delete(citas::table.filter(citas::id.eq(&id_s))).execute(c)
                           }))?;
    if n == 0 {
      return Err(LifecycleError::NotFound(format!("cita {}", id)));
    }
    Ok(())
  }
  fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, LifecycleError> {
    let mut conn = self.conn()?;
    let mut q = citas::table.into_boxed();
    if let Some(d) = filter.date {
      q = q.filter(citas::date.eq(d.format(DATE_FMT).to_string()));
    }
    if let Some(d) = filter.from_date {
      q = q.filter(citas::date.ge(d.format(DATE_FMT).to_string()));
    }
    if let Some(s) = filter.status {
      q = q.filter(citas::status.eq(s.as_str()));
    }
    if let Some(k) = filter.kind {
      q = q.filter(citas::kind.eq(k.as_str()));
    }
    if let Some(p) = filter.patient_id {
      q = q.filter(citas::patient_id.eq(p.to_string()));
    }
    if let Some(r) = filter.resource_id {
      q = q.filter(citas::resource_id.eq(r.to_string()));
    }
    let rows = map_db_err(q.order((citas::date.asc(), citas::time.asc())).load::<CitaRow>(&mut conn))?;
    rows.into_iter().map(CitaRow::into_appointment).collect()
  }
  fn occupied_times(&self, kind: AppointmentKind, resource_id: &Uuid, date: NaiveDate) -> Result<Vec<NaiveTime>, LifecycleError> {
    let mut conn = self.conn()?;
    let released = [AppointmentStatus::Cancelled.as_str(), AppointmentStatus::NoShow.as_str()];
    let times = map_db_err(citas::table.filter(citas::kind.eq(kind.as_str()))
                                       .filter(citas::resource_id.eq(resource_id.to_string()))
                                       .filter(citas::date.eq(date.format(DATE_FMT).to_string()))
                                       .filter(citas::status.ne_all(released))
                                       .select(citas::time)
                                       .distinct()
                                       .order(citas::time.asc())
                                       .load::<String>(&mut conn))?;
    times.iter()
         .map(|t| NaiveTime::parse_from_str(t, TIME_FMT).map_err(|_| corrupt("hora", t)))
         .collect()
  }
  fn record_change(&self, change: &StatusChange) -> Result<(), LifecycleError> {
    let mut conn = self.conn()?;
    let cita_id = change.appointment_id.to_string();
    map_db_err(conn.immediate_transaction::<_, DieselError, _>(|c| {
                     let last: Option<i64> = hist_dsl::cita_historial.filter(hist_dsl::cita_id.eq(&cita_id))
                                                                     .select(diesel::dsl::max(hist_dsl::seq))
                                                                     .first(c)?;
                     let row = HistorialRow { id: change.id.to_string(),
                                              cita_id: cita_id.clone(),
                                              seq: last.unwrap_or(0) + 1,
                                              action: change.action.as_str().to_string(),
                                              from_status: change.from.map(|s| s.as_str().to_string()),
                                              to_status: change.to.as_str().to_string(),
                                              actor: change.actor.clone(),
                                              detail: change.detail.clone(),
                                              at: ts_to_text(change.at) };
                     diesel::insert_into(hist_dsl::cita_historial).values(&row).execute(c)?;
                     Ok(())
                   }))
  }
  fn history(&self, appointment_id: &Uuid) -> Result<Vec<StatusChange>, LifecycleError> {
    let mut conn = self.conn()?;
    let rows = map_db_err(hist_dsl::cita_historial.filter(hist_dsl::cita_id.eq(appointment_id.to_string()))
                                                  .order(hist_dsl::seq.asc())
                                                  .load::<HistorialRow>(&mut conn))?;
    rows.into_iter().map(HistorialRow::into_change).collect()
  }
  fn mark_reminder_sent(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), LifecycleError> {
    let mut conn = self.conn()?;
    let n = map_db_err(diesel::update(citas::table.filter(citas::id.eq(id.to_string())))
                       .set(citas::reminder_sent_at.eq(Some(ts_to_text(at))))
                       .execute(&mut conn))?;
    if n == 0 {
      return Err(LifecycleError::NotFound(format!("cita {}", id)));
    }
    Ok(())
  }
}
impl ContactDirectory for DieselAppointmentRepository {
  fn upsert_contact(&self, contact: PatientContact) -> Result<PatientContact, DomainError> {
    let contact = contact.validated()?;
    let mut conn = self.pool.get().map_err(|e| DomainError::ExternalError(format!("pool: {}", e)))?;
    let row = PacienteRow { patient_id: contact.patient_id.to_string(),
                            pet_name: contact.pet_name.clone(),
                            owner_name: contact.owner_name.clone(),
                            owner_email: contact.owner_email.clone(),
                            species: contact.species.clone() };
    diesel::insert_into(pac_dsl::pacientes).values(&row)
                                           .on_conflict(pac_dsl::patient_id)
                                           .do_update()
                                           .set(&row)
                                           .execute(&mut conn)
                                           .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    Ok(contact)
  }
  fn get_contact(&self, patient_id: &Uuid) -> Result<Option<PatientContact>, DomainError> {
    let mut conn = self.pool.get().map_err(|e| DomainError::ExternalError(format!("pool: {}", e)))?;
    let opt = pac_dsl::pacientes.filter(pac_dsl::patient_id.eq(patient_id.to_string()))
                                .first::<PacienteRow>(&mut conn)
                                .optional()
                                .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    Ok(opt.map(|r| PatientContact { patient_id: *patient_id,
                                    pet_name: r.pet_name,
                                    owner_name: r.owner_name,
                                    owner_email: r.owner_email,
                                    species: r.species }))
  }
}
/// Crea el repositorio a partir de `VET_DB_URL` (o `DATABASE_URL`). Sin
/// ninguna de las dos se usa `./db/mollyvet.db`.
pub fn new_from_env() -> Result<DieselAppointmentRepository, LifecycleError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("VET_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                       .unwrap_or_else(|_| "./db/mollyvet.db".into());
  open_sqlite(&url)
}
/// Abre la base SQLite en `url`, creando el directorio padre si no existe.
/// Rechaza URLs de Postgres o MySQL.
pub fn open_sqlite(url: &str) -> Result<DieselAppointmentRepository, LifecycleError> {
  let l = url.to_lowercase();
  if l.starts_with("postgres") || l.starts_with("mysql") {
    return Err(LifecycleError::Storage("vet-persistence sólo soporta SQLite; VET_DB_URL debe ser una ruta de fichero".into()));
  }
  if !l.starts_with("file:") && !l.contains(":memory:") {
    if let Some(parent) = Path::new(url).parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent).map_err(|e| {
                                       LifecycleError::Storage(format!("no se pudo crear {}: {}", parent.display(), e))
                                     })?;
    }
  }
  log::info!("usando base de datos SQLite en {}", url);
  DieselAppointmentRepository::new(url)
}
