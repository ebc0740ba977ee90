use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use lifecycle::{AppointmentFilter, AppointmentRepository, AppointmentService, ChangeAction, InMemoryAppointmentRepository,
                LifecycleError, NoopNotifier, PersistResult, RecordingNotifier, StatusChange, TransitionRequest,
                DEFAULT_CANCELLATION_REASON, PATIENT_NOT_FOUND_MESSAGE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;
use vet_domain::{Appointment, AppointmentKind, AppointmentStatus, AppointmentUpdate, DomainStubs, NewAppointment,
                 StatsPeriod};

fn today() -> NaiveDate {
  NaiveDate::from_ymd_opt(2030, 5, 1).unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
  NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn medical(resource: Option<Uuid>, date: NaiveDate, time: NaiveTime) -> NewAppointment {
  NewAppointment { kind: AppointmentKind::Medical,
                   patient_id: Uuid::new_v4(),
                   resource_id: resource,
                   service_type: None,
                   date,
                   time,
                   estimated_duration: None,
                   price: None,
                   notes: Some("revisión anual".into()),
                   cut_style: None }
}

fn setup() -> (Arc<InMemoryAppointmentRepository>, Arc<RecordingNotifier>, AppointmentService<InMemoryAppointmentRepository>) {
  let repo = Arc::new(InMemoryAppointmentRepository::new());
  let notifier = Arc::new(RecordingNotifier::new());
  let service = AppointmentService::new(repo.clone(), notifier.clone());
  (repo, notifier, service)
}

#[test]
fn confirming_notifies_exactly_once() {
  let (_repo, notifier, service) = setup();
  let appt = service.book(medical(None, today(), hm(9, 0)), "recepcion", today()).unwrap();

  let confirmed = service.confirm(&appt.id, "recepcion").unwrap();
  assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
  assert!(confirmed.confirmed_at.is_some());
  assert_eq!(notifier.sent(), vec![appt.id]);

  service.start(&appt.id, "dra").unwrap();
  service.complete(&appt.id, Some("todo bien".into()), "dra").unwrap();
  assert_eq!(notifier.count(), 1);
}

#[test]
fn scheduled_to_completed_is_rejected_and_persisted_state_kept() {
  let (repo, notifier, service) = setup();
  let appt = service.book(medical(None, today(), hm(9, 0)), "recepcion", today()).unwrap();

  let err = service.complete(&appt.id, None, "dra").unwrap_err();
  assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
  assert_eq!(repo.load(&appt.id).unwrap().status, AppointmentStatus::Scheduled);
  assert_eq!(notifier.count(), 0);
}

#[test]
fn stale_expected_status_conflicts() {
  let (repo, _notifier, service) = setup();
  let appt = service.book(medical(None, today(), hm(9, 0)), "recepcion", today()).unwrap();
  service.confirm(&appt.id, "recepcion").unwrap();

  let first = TransitionRequest::to(AppointmentStatus::InProgress).expecting(AppointmentStatus::Confirmed);
  let second = TransitionRequest::to(AppointmentStatus::Cancelled).expecting(AppointmentStatus::Confirmed);
  assert_eq!(service.transition(&appt.id, &first, "dra").unwrap().status, AppointmentStatus::InProgress);
  let err = service.transition(&appt.id, &second, "recepcion").unwrap_err();
  assert_eq!(err,
             LifecycleError::ConflictingTransition { expected: AppointmentStatus::Confirmed,
                                                     actual: AppointmentStatus::InProgress });
  assert_eq!(repo.load(&appt.id).unwrap().status, AppointmentStatus::InProgress);
}

#[test]
fn concurrent_transitions_only_one_wins() {
  let (repo, _notifier, service) = setup();
  let service = Arc::new(service);
  let appt = service.book(medical(None, today(), hm(9, 0)), "recepcion", today()).unwrap();
  service.confirm(&appt.id, "recepcion").unwrap();

  let barrier = Arc::new(Barrier::new(2));
  let mut handles = Vec::new();
  for target in [AppointmentStatus::InProgress, AppointmentStatus::NoShow] {
    let service = service.clone();
    let barrier = barrier.clone();
    let id = appt.id;
    handles.push(thread::spawn(move || {
                   let req = TransitionRequest::to(target).expecting(AppointmentStatus::Confirmed);
                   barrier.wait();
                   service.transition(&id, &req, "x")
                 }));
  }
  let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
  let ok = results.iter().filter(|r| r.is_ok()).count();
  assert_eq!(ok, 1);
  assert!(results.iter()
                 .any(|r| matches!(r, Err(LifecycleError::ConflictingTransition { .. }))));
  let final_status = repo.load(&appt.id).unwrap().status;
  assert!(final_status == AppointmentStatus::InProgress || final_status == AppointmentStatus::NoShow);
}

#[test]
fn notifier_failure_does_not_roll_back() {
  let repo = Arc::new(InMemoryAppointmentRepository::new());
  let notifier = Arc::new(RecordingNotifier::failing());
  let service = AppointmentService::new(repo.clone(), notifier.clone());
  let appt = service.book(medical(None, today(), hm(9, 0)), "recepcion", today()).unwrap();

  let confirmed = service.confirm(&appt.id, "recepcion").unwrap();
  assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
  assert_eq!(repo.load(&appt.id).unwrap().status, AppointmentStatus::Confirmed);
  assert_eq!(notifier.count(), 1);
}

#[test]
fn double_booking_same_resource_is_refused() {
  let (_repo, _notifier, service) = setup();
  let doctor = Uuid::new_v4();
  let first = service.book(medical(Some(doctor), today(), hm(10, 0)), "recepcion", today()).unwrap();

  let err = service.book(medical(Some(doctor), today(), hm(10, 0)), "recepcion", today()).unwrap_err();
  assert!(matches!(err, LifecycleError::SlotTaken(_)));
  // otro doctor, mismo horario
  service.book(medical(Some(Uuid::new_v4()), today(), hm(10, 0)), "recepcion", today()).unwrap();

  // cancelar libera el horario
  service.cancel(&first.id, None, "recepcion").unwrap();
  assert!(service.is_available(AppointmentKind::Medical, &doctor, today(), hm(10, 0)).unwrap());
  service.book(medical(Some(doctor), today(), hm(10, 0)), "recepcion", today()).unwrap();
}

#[test]
fn cancel_and_complete_record_details_and_history() {
  let (_repo, _notifier, service) = setup();
  let a = service.book(medical(None, today(), hm(9, 0)), "recepcion", today()).unwrap();
  let cancelled = service.cancel(&a.id, None, "recepcion").unwrap();
  assert_eq!(cancelled.cancellation_reason.as_deref(), Some(DEFAULT_CANCELLATION_REASON));

  let b = service.book(medical(None, today(), hm(9, 30)), "recepcion", today()).unwrap();
  service.confirm(&b.id, "recepcion").unwrap();
  service.start(&b.id, "dra").unwrap();
  let done = service.complete(&b.id, Some("  vacuna aplicada ".into()), "dra").unwrap();
  assert_eq!(done.final_observations.as_deref(), Some("vacuna aplicada"));

  let history = service.history(&b.id).unwrap();
  let steps: Vec<_> = history.iter().map(|c| (c.action, c.from, c.to)).collect();
  assert_eq!(steps,
             vec![(ChangeAction::Creada, None, AppointmentStatus::Scheduled),
                  (ChangeAction::CambioEstado, Some(AppointmentStatus::Scheduled), AppointmentStatus::Confirmed),
                  (ChangeAction::CambioEstado, Some(AppointmentStatus::Confirmed), AppointmentStatus::InProgress),
                  (ChangeAction::CambioEstado, Some(AppointmentStatus::InProgress), AppointmentStatus::Completed)]);
  assert_eq!(history[3].actor, "dra");
  assert_eq!(history[3].detail.as_deref(), Some("vacuna aplicada"));
}

#[test]
fn reschedule_moves_slot_and_rechecks_availability() {
  let (_repo, _notifier, service) = setup();
  let doctor = Uuid::new_v4();
  let a = service.book(medical(Some(doctor), today(), hm(9, 0)), "recepcion", today()).unwrap();
  service.book(medical(Some(doctor), today(), hm(11, 0)), "recepcion", today()).unwrap();

  let clash = AppointmentUpdate { time: Some(hm(11, 0)),
                                  ..Default::default() };
  assert!(matches!(service.reschedule(&a.id, &clash, None, "recepcion", today()),
                   Err(LifecycleError::SlotTaken(_))));

  let ok = AppointmentUpdate { time: Some(hm(12, 0)),
                               notes: Some("traer cartilla".into()),
                               ..Default::default() };
  let moved = service.reschedule(&a.id, &ok, Some(AppointmentStatus::Scheduled), "recepcion", today())
                     .unwrap();
  assert_eq!(moved.time, hm(12, 0));
  assert_eq!(moved.status, AppointmentStatus::Scheduled);
  assert_eq!(service.history(&a.id).unwrap().last().map(|c| c.action), Some(ChangeAction::Reprogramada));

  let free = service.available_slots(AppointmentKind::Medical, &doctor, today()).unwrap();
  assert!(free.contains(&hm(9, 0)));
  assert!(!free.contains(&hm(11, 0)));
  assert!(!free.contains(&hm(12, 0)));
}

#[test]
fn reschedule_refuses_terminal_appointments() {
  let (_repo, _notifier, service) = setup();
  let a = service.book(medical(None, today(), hm(9, 0)), "recepcion", today()).unwrap();
  service.cancel(&a.id, Some("viaje".into()), "recepcion").unwrap();
  let upd = AppointmentUpdate { notes: Some("x".into()),
                                ..Default::default() };
  match service.reschedule(&a.id, &upd, None, "recepcion", today()) {
    Err(LifecycleError::Validation(msg)) => assert!(msg.contains("cancelada")),
    other => panic!("expected validation error, got {:?}", other),
  }
}

#[test]
fn upcoming_stats_and_reminders() {
  let (_repo, _notifier, service) = setup();
  let tomorrow = today() + Duration::days(1);
  let a = service.book(medical(None, tomorrow, hm(10, 0)), "r", today()).unwrap();
  let b = service.book(medical(None, today(), hm(9, 0)), "r", today()).unwrap();
  let mut urgent = medical(None, tomorrow, hm(8, 0));
  urgent.service_type = Some("urgencia".into());
  let c = service.book(urgent, "r", today()).unwrap();
  service.cancel(&b.id, None, "r").unwrap();

  let upcoming = service.upcoming(today(), 10).unwrap();
  assert_eq!(upcoming.iter().map(|x| x.id).collect::<Vec<_>>(), vec![c.id, a.id]);

  let stats = service.stats(StatsPeriod::Day, today()).unwrap();
  assert_eq!(stats.total, 3);
  assert_eq!(stats.cancelled, 1);
  assert_eq!(stats.scheduled, 2);
  assert_eq!(stats.emergencies, 1);

  let pending = service.pending_reminders(tomorrow).unwrap();
  assert_eq!(pending.len(), 2);
  service.mark_reminder_sent(&a.id, Utc::now()).unwrap();
  let pending = service.pending_reminders(tomorrow).unwrap();
  assert_eq!(pending.iter().map(|x| x.id).collect::<Vec<_>>(), vec![c.id]);
}

#[test]
fn list_filters_and_delete() {
  let (_repo, _notifier, service) = setup();
  let a = service.book(medical(None, today(), hm(9, 0)), "r", today()).unwrap();
  service.book(medical(None, today() + Duration::days(2), hm(9, 0)), "r", today()).unwrap();

  let filter = AppointmentFilter { date: Some(today()),
                                   ..Default::default() };
  assert_eq!(service.list(&filter).unwrap().len(), 1);
  let filter = AppointmentFilter { patient_id: Some(a.patient_id),
                                   ..Default::default() };
  assert_eq!(service.list(&filter).unwrap()[0].id, a.id);

  service.delete(&a.id).unwrap();
  assert!(matches!(service.get(&a.id), Err(LifecycleError::NotFound(_))));
  assert!(matches!(service.delete(&a.id), Err(LifecycleError::NotFound(_))));
}

#[test]
fn booking_in_the_past_is_a_validation_error() {
  let service = AppointmentService::new(Arc::new(InMemoryAppointmentRepository::new()), Arc::new(NoopNotifier));
  let err = service.book(medical(None, today() - Duration::days(1), hm(9, 0)), "r", today())
                   .unwrap_err();
  assert_eq!(err, LifecycleError::Validation("No se pueden programar citas en fechas pasadas".into()));
}

#[test]
fn concurrent_bookings_for_one_slot_admit_a_single_winner() {
  let (repo, _notifier, service) = setup();
  let service = Arc::new(service);
  let doctor = Uuid::new_v4();

  let barrier = Arc::new(Barrier::new(8));
  let handles: Vec<_> = (0..8).map(|_| {
                                let service = service.clone();
                                let barrier = barrier.clone();
                                thread::spawn(move || {
                                  barrier.wait();
                                  service.book(medical(Some(doctor), today(), hm(10, 0)), "recepcion", today())
                                })
                              })
                              .collect();
  let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
  assert!(results.iter()
                 .filter(|r| r.is_err())
                 .all(|r| matches!(r, Err(LifecycleError::SlotTaken(_)))));
  assert_eq!(repo.occupied_times(AppointmentKind::Medical, &doctor, today()).unwrap(), vec![hm(10, 0)]);
  let filter = AppointmentFilter { resource_id: Some(doctor),
                                   ..Default::default() };
  assert_eq!(repo.list(&filter).unwrap().len(), 1);
}

#[test]
fn concurrent_reschedules_into_one_slot_admit_a_single_winner() {
  let (repo, _notifier, service) = setup();
  let service = Arc::new(service);
  let doctor = Uuid::new_v4();
  let a = service.book(medical(Some(doctor), today(), hm(9, 0)), "recepcion", today()).unwrap();
  let b = service.book(medical(Some(doctor), today(), hm(9, 30)), "recepcion", today()).unwrap();

  let barrier = Arc::new(Barrier::new(2));
  let handles: Vec<_> = [a.id, b.id].into_iter()
                                    .map(|id| {
                                      let service = service.clone();
                                      let barrier = barrier.clone();
                                      thread::spawn(move || {
                                        let upd = AppointmentUpdate { time: Some(hm(15, 0)),
                                                                      ..Default::default() };
                                        barrier.wait();
                                        service.reschedule(&id, &upd, None, "recepcion", today())
                                      })
                                    })
                                    .collect();
  let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
  assert!(results.iter().any(|r| matches!(r, Err(LifecycleError::SlotTaken(_)))));
  let times = repo.occupied_times(AppointmentKind::Medical, &doctor, today()).unwrap();
  assert_eq!(times.iter().filter(|t| **t == hm(15, 0)).count(), 1);
}

#[test]
fn reschedule_with_stale_updated_at_is_a_conflict() {
  let (repo, _notifier, service) = setup();
  let a = service.book(medical(None, today(), hm(9, 0)), "recepcion", today()).unwrap();
  let stale = repo.load(&a.id).unwrap();

  let upd = AppointmentUpdate { time: Some(hm(10, 0)),
                                ..Default::default() };
  service.reschedule(&a.id, &upd, None, "recepcion", today()).unwrap();

  let mut late = stale.clone();
  late.time = hm(12, 0);
  late.updated_at = Utc::now();
  let outcome = repo.save_rescheduled(&late, stale.status, stale.updated_at).unwrap();
  assert!(matches!(outcome, PersistResult::Conflict { actual: AppointmentStatus::Scheduled }));
  assert_eq!(repo.load(&a.id).unwrap().time, hm(10, 0));
}

/// Repositorio que, la primera vez que se carga una cita, deja que otra
/// reprogramación se escriba antes de devolver la lectura ya obsoleta.
struct InterleavedRepository {
  inner: InMemoryAppointmentRepository,
  armed: AtomicBool,
}

impl AppointmentRepository for InterleavedRepository {
  fn load(&self, id: &Uuid) -> lifecycle::Result<Appointment> {
    let snapshot = self.inner.load(id)?;
    if self.armed.swap(false, Ordering::SeqCst) {
      let mut other = snapshot.clone();
      other.notes = Some("cambio de otra sesión".into());
      other.updated_at = snapshot.updated_at + Duration::seconds(1);
      self.inner.save_rescheduled(&other, snapshot.status, snapshot.updated_at)?;
    }
    Ok(snapshot)
  }
  fn insert(&self, appointment: &Appointment) -> lifecycle::Result<()> {
    self.inner.insert(appointment)
  }
  fn insert_if_free(&self, appointment: &Appointment) -> lifecycle::Result<()> {
    self.inner.insert_if_free(appointment)
  }
  fn save(&self, appointment: &Appointment, expected_status: AppointmentStatus) -> lifecycle::Result<PersistResult> {
    self.inner.save(appointment, expected_status)
  }
  fn save_rescheduled(&self,
                      appointment: &Appointment,
                      expected_status: AppointmentStatus,
                      expected_updated_at: DateTime<Utc>)
                      -> lifecycle::Result<PersistResult> {
    self.inner.save_rescheduled(appointment, expected_status, expected_updated_at)
  }
  fn delete(&self, id: &Uuid) -> lifecycle::Result<()> {
    self.inner.delete(id)
  }
  fn list(&self, filter: &AppointmentFilter) -> lifecycle::Result<Vec<Appointment>> {
    self.inner.list(filter)
  }
  fn occupied_times(&self, kind: AppointmentKind, resource_id: &Uuid, date: NaiveDate) -> lifecycle::Result<Vec<NaiveTime>> {
    self.inner.occupied_times(kind, resource_id, date)
  }
  fn record_change(&self, change: &StatusChange) -> lifecycle::Result<()> {
    self.inner.record_change(change)
  }
  fn history(&self, appointment_id: &Uuid) -> lifecycle::Result<Vec<StatusChange>> {
    self.inner.history(appointment_id)
  }
  fn mark_reminder_sent(&self, id: &Uuid, at: DateTime<Utc>) -> lifecycle::Result<()> {
    self.inner.mark_reminder_sent(id, at)
  }
}

#[test]
fn reschedule_does_not_overwrite_a_concurrent_change() {
  let repo = Arc::new(InterleavedRepository { inner: InMemoryAppointmentRepository::new(),
                                              armed: AtomicBool::new(false) });
  let service = AppointmentService::new(repo.clone(), Arc::new(NoopNotifier));
  let a = service.book(medical(None, today(), hm(9, 0)), "recepcion", today()).unwrap();

  repo.armed.store(true, Ordering::SeqCst);
  let upd = AppointmentUpdate { time: Some(hm(16, 0)),
                                ..Default::default() };
  let err = service.reschedule(&a.id, &upd, None, "recepcion", today()).unwrap_err();
  assert_eq!(err,
             LifecycleError::ConflictingTransition { expected: AppointmentStatus::Scheduled,
                                                     actual: AppointmentStatus::Scheduled });
  let stored = repo.load(&a.id).unwrap();
  assert_eq!(stored.time, hm(9, 0));
  assert_eq!(stored.notes.as_deref(), Some("cambio de otra sesión"));
}

#[test]
fn booking_requires_a_registered_patient() {
  let (directory, with_email, _without_email) = DomainStubs::sample_directory();
  let service = AppointmentService::new(Arc::new(InMemoryAppointmentRepository::new()), Arc::new(NoopNotifier))
    .with_contacts(Arc::new(directory));

  let err = service.book(medical(None, today(), hm(9, 0)), "recepcion", today()).unwrap_err();
  assert_eq!(err, LifecycleError::NotFound(PATIENT_NOT_FOUND_MESSAGE.into()));

  let mut known = medical(None, today(), hm(9, 0));
  known.patient_id = with_email;
  assert_eq!(service.book(known, "recepcion", today()).unwrap().patient_id, with_email);
}

#[test]
fn oversized_duration_is_a_validation_error() {
  let (repo, _notifier, service) = setup();
  let mut req = medical(None, today(), hm(9, 0));
  req.estimated_duration = Some(3_000_000_000);
  assert!(matches!(service.book(req, "recepcion", today()), Err(LifecycleError::Validation(_))));
  assert!(repo.list(&AppointmentFilter::default()).unwrap().is_empty());
}
