use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use lifecycle::{AppointmentFilter, AppointmentRepository, AppointmentService, ChangeAction, LifecycleError, PersistResult,
                RecordingNotifier, TransitionRequest};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;
use vet_domain::{AppointmentKind, AppointmentStatus, ContactDirectory, NewAppointment, PatientContact};
use vet_persistence::DieselAppointmentRepository;

fn temp_repo() -> (DieselAppointmentRepository, std::path::PathBuf) {
  // Fichero temporal: evita problemas de URIs `mode=memory` con pools.
  let tmp_path = std::env::temp_dir().join(format!("vet_test_{}.db", Uuid::new_v4()));
  let repo = DieselAppointmentRepository::new(tmp_path.to_str().unwrap()).expect("repo");
  (repo, tmp_path)
}

fn cleanup(path: std::path::PathBuf) {
  let _ = std::fs::remove_file(&path);
  let _ = std::fs::remove_file(path.with_extension("db-wal"));
  let _ = std::fs::remove_file(path.with_extension("db-shm"));
}

fn today() -> NaiveDate {
  NaiveDate::from_ymd_opt(2030, 6, 10).unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
  NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn grooming(stylist: Uuid, time: NaiveTime) -> NewAppointment {
  NewAppointment { kind: AppointmentKind::Grooming,
                   patient_id: Uuid::new_v4(),
                   resource_id: Some(stylist),
                   service_type: Some("baño_corte".into()),
                   date: today(),
                   time,
                   estimated_duration: None,
                   price: Some(Decimal::from_str("350.50").unwrap()),
                   notes: Some("pelo largo".into()),
                   cut_style: Some("cachorro".into()) }
}

#[test]
fn appointment_roundtrips_through_sqlite() {
  let (repo, path) = temp_repo();
  let appt = grooming(Uuid::new_v4(), hm(10, 30)).into_appointment(today(), Utc::now()).unwrap();
  repo.insert(&appt).expect("insert");

  let loaded = repo.load(&appt.id).expect("load");
  assert_eq!(loaded, appt);
  assert!(matches!(repo.load(&Uuid::new_v4()), Err(LifecycleError::NotFound(_))));
  cleanup(path);
}

#[test]
fn save_is_conditioned_on_persisted_status() {
  let (repo, path) = temp_repo();
  let appt = grooming(Uuid::new_v4(), hm(9, 0)).into_appointment(today(), Utc::now()).unwrap();
  repo.insert(&appt).unwrap();

  let mut confirmed = appt.clone();
  confirmed.status = AppointmentStatus::Confirmed;
  match repo.save(&confirmed, AppointmentStatus::Scheduled).unwrap() {
    PersistResult::Ok { appointment } => assert_eq!(appointment.status, AppointmentStatus::Confirmed),
    other => panic!("expected Ok, got {:?}", other),
  }

  let mut stale = appt.clone();
  stale.status = AppointmentStatus::Cancelled;
  assert_eq!(repo.save(&stale, AppointmentStatus::Scheduled).unwrap(),
             PersistResult::Conflict { actual: AppointmentStatus::Confirmed });
  assert_eq!(repo.load(&appt.id).unwrap().status, AppointmentStatus::Confirmed);

  let mut ghost = appt.clone();
  ghost.id = Uuid::new_v4();
  assert!(matches!(repo.save(&ghost, AppointmentStatus::Scheduled), Err(LifecycleError::NotFound(_))));
  cleanup(path);
}

#[test]
fn service_over_sqlite_keeps_history_and_slots() {
  let (repo, path) = temp_repo();
  let repo = Arc::new(repo);
  let notifier = Arc::new(RecordingNotifier::new());
  let service = AppointmentService::new(repo.clone(), notifier.clone());
  let stylist = Uuid::new_v4();

  let a = service.book(grooming(stylist, hm(11, 0)), "recepcion", today()).unwrap();
  assert!(matches!(service.book(grooming(stylist, hm(11, 0)), "recepcion", today()),
                   Err(LifecycleError::SlotTaken(_))));
  let free = service.available_slots(AppointmentKind::Grooming, &stylist, today()).unwrap();
  assert_eq!(free.len(), 19);
  assert!(!free.contains(&hm(11, 0)));

  service.confirm(&a.id, "recepcion").unwrap();
  let err = service.transition(&a.id,
                               &TransitionRequest::to(AppointmentStatus::NoShow).expecting(AppointmentStatus::Scheduled),
                               "recepcion")
                   .unwrap_err();
  assert_eq!(err,
             LifecycleError::ConflictingTransition { expected: AppointmentStatus::Scheduled,
                                                     actual: AppointmentStatus::Confirmed });
  service.cancel(&a.id, Some("lluvia".into()), "recepcion").unwrap();
  assert!(service.is_available(AppointmentKind::Grooming, &stylist, today(), hm(11, 0)).unwrap());
  assert_eq!(notifier.count(), 1);

  let history = service.history(&a.id).unwrap();
  assert_eq!(history.iter().map(|c| c.action).collect::<Vec<_>>(),
             vec![ChangeAction::Creada, ChangeAction::CambioEstado, ChangeAction::CambioEstado]);
  assert_eq!(history[2].to, AppointmentStatus::Cancelled);
  assert_eq!(history[2].detail.as_deref(), Some("lluvia"));

  service.delete(&a.id).unwrap();
  assert!(repo.history(&a.id).unwrap().is_empty());
  assert!(matches!(repo.delete(&a.id), Err(LifecycleError::NotFound(_))));
  cleanup(path);
}

#[test]
fn list_filters_and_reminder_marks() {
  let (repo, path) = temp_repo();
  let stylist = Uuid::new_v4();
  let mut later = grooming(stylist, hm(15, 0));
  later.date = today() + Duration::days(1);
  let a = grooming(stylist, hm(12, 0)).into_appointment(today(), Utc::now()).unwrap();
  let b = grooming(stylist, hm(8, 30)).into_appointment(today(), Utc::now()).unwrap();
  let c = later.into_appointment(today(), Utc::now()).unwrap();
  for x in [&a, &b, &c] {
    repo.insert(x).unwrap();
  }

  let all = repo.list(&AppointmentFilter::default()).unwrap();
  assert_eq!(all.iter().map(|x| x.id).collect::<Vec<_>>(), vec![b.id, a.id, c.id]);
  let day = repo.list(&AppointmentFilter { date: Some(today()),
                                           ..Default::default() })
                .unwrap();
  assert_eq!(day.len(), 2);
  let from = repo.list(&AppointmentFilter { from_date: Some(today() + Duration::days(1)),
                                            ..Default::default() })
                 .unwrap();
  assert_eq!(from.iter().map(|x| x.id).collect::<Vec<_>>(), vec![c.id]);
  let by_patient = repo.list(&AppointmentFilter { patient_id: Some(a.patient_id),
                                                  kind: Some(AppointmentKind::Grooming),
                                                  ..Default::default() })
                       .unwrap();
  assert_eq!(by_patient.len(), 1);

  let at = Utc::now();
  repo.mark_reminder_sent(&a.id, at).unwrap();
  assert_eq!(repo.load(&a.id).unwrap().reminder_sent_at, Some(at));
  assert!(matches!(repo.mark_reminder_sent(&Uuid::new_v4(), at), Err(LifecycleError::NotFound(_))));
  cleanup(path);
}

#[test]
fn contacts_are_upserted() {
  let (repo, path) = temp_repo();
  let pid = Uuid::new_v4();
  let contact = PatientContact { patient_id: pid,
                                 pet_name: " Firulais ".into(),
                                 owner_name: "Marta".into(),
                                 owner_email: Some("marta@example.com".into()),
                                 species: None };
  let saved = repo.upsert_contact(contact.clone()).unwrap();
  assert_eq!(saved.pet_name, "Firulais");
  let updated = PatientContact { owner_email: None,
                                 ..contact };
  repo.upsert_contact(updated).unwrap();
  let got = repo.get_contact(&pid).unwrap().expect("contact");
  assert_eq!(got.owner_email, None);
  assert_eq!(got.pet_name, "Firulais");
  assert!(repo.get_contact(&Uuid::new_v4()).unwrap().is_none());
  cleanup(path);
}

#[test]
fn out_of_range_duration_is_refused_and_listing_survives() {
  let (repo, path) = temp_repo();
  let mut appt = grooming(Uuid::new_v4(), hm(9, 0)).into_appointment(today(), Utc::now()).unwrap();
  appt.estimated_duration = Some(3_000_000_000);
  assert!(matches!(repo.insert(&appt), Err(LifecycleError::Validation(_))));
  assert!(matches!(repo.insert_if_free(&appt), Err(LifecycleError::Validation(_))));
  assert!(matches!(repo.load(&appt.id), Err(LifecycleError::NotFound(_))));
  assert!(repo.list(&AppointmentFilter::default()).unwrap().is_empty());
  cleanup(path);
}

#[test]
fn concurrent_bookings_on_sqlite_admit_a_single_winner() {
  let (repo, path) = temp_repo();
  let repo = Arc::new(repo);
  let service = Arc::new(AppointmentService::new(repo.clone(), Arc::new(RecordingNotifier::new())));
  let stylist = Uuid::new_v4();

  let barrier = Arc::new(Barrier::new(4));
  let handles: Vec<_> = (0..4).map(|_| {
                                let service = service.clone();
                                let barrier = barrier.clone();
                                thread::spawn(move || {
                                  barrier.wait();
                                  service.book(grooming(stylist, hm(12, 0)), "recepcion", today())
                                })
                              })
                              .collect();
  let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{:?}", results);
  assert!(results.iter()
                 .filter(|r| r.is_err())
                 .all(|r| matches!(r, Err(LifecycleError::SlotTaken(_)))));
  assert_eq!(repo.occupied_times(AppointmentKind::Grooming, &stylist, today()).unwrap(), vec![hm(12, 0)]);
  drop(service);
  drop(repo);
  cleanup(path);
}

#[test]
fn rescheduled_save_checks_updated_at_and_slot() {
  let (repo, path) = temp_repo();
  let stylist = Uuid::new_v4();
  let appt = grooming(stylist, hm(9, 0)).into_appointment(today(), Utc::now()).unwrap();
  let other = grooming(stylist, hm(11, 0)).into_appointment(today(), Utc::now()).unwrap();
  repo.insert_if_free(&appt).unwrap();
  repo.insert_if_free(&other).unwrap();
  assert!(matches!(repo.insert_if_free(&grooming(stylist, hm(11, 0)).into_appointment(today(), Utc::now()).unwrap()),
                   Err(LifecycleError::SlotTaken(_))));

  let mut clash = appt.clone();
  clash.time = hm(11, 0);
  clash.updated_at = appt.updated_at + Duration::seconds(1);
  assert!(matches!(repo.save_rescheduled(&clash, appt.status, appt.updated_at),
                   Err(LifecycleError::SlotTaken(_))));

  let mut moved = appt.clone();
  moved.time = hm(10, 0);
  moved.updated_at = appt.updated_at + Duration::seconds(1);
  assert!(matches!(repo.save_rescheduled(&moved, appt.status, appt.updated_at).unwrap(),
                   PersistResult::Ok { .. }));

  let mut late = appt.clone();
  late.time = hm(15, 0);
  late.updated_at = appt.updated_at + Duration::seconds(2);
  assert_eq!(repo.save_rescheduled(&late, appt.status, appt.updated_at).unwrap(),
             PersistResult::Conflict { actual: AppointmentStatus::Scheduled });
  assert_eq!(repo.load(&appt.id).unwrap().time, hm(10, 0));
  cleanup(path);
}
