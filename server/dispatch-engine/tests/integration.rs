//! Integration tests for the dispatch engine.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use dispatch_engine::geo;
use dispatch_engine::{
  Config, DispatchError, Engine, EscalationScheduler, Event, IncidentDraft, IncidentStatus, ManualClock, Responder,
  ResponderStatus, Severity,
};

const KM_PER_DEG_LAT: f64 = geo::EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

fn manual_engine() -> (Arc<Engine>, Arc<ManualClock>) {
  let clock = Arc::new(ManualClock::new(
    Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap(),
  ));
  let engine = Arc::new(Engine::with_clock(Config::default(), clock.clone()));
  (engine, clock)
}

fn responder_north(id: &str, km: f64) -> Responder {
  Responder::new(id, 20.35 + km / KM_PER_DEG_LAT, 85.81)
}

fn fixture_draft() -> IncidentDraft {
  let json = r#"{
    "severity": "High",
    "latitude": 20.35,
    "longitude": 85.81,
    "speed_kmh": 72,
    "peak_accel_g": 41.5,
    "peak_gyro_dps": 180,
    "address": "NH-16 near Rasulgarh",
    "sensor_source": "DEV-482",
    "report_type": "auto",
    "sent_via": "Satellite",
    "notes": "Automated sensor alert detected.",
    "some_unknown_field": "ignored"
  }"#;
  serde_json::from_str(json).unwrap()
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
  std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[test]
fn nearest_responders_ranked_with_eta() {
  let (engine, _) = manual_engine();
  engine.register_responder(responder_north("R-2KM", 2.0)).unwrap();
  engine.register_responder(responder_north("R-5KM", 5.0)).unwrap();
  engine.register_responder(responder_north("R-1KM", 1.0)).unwrap();

  let incident = engine.ingest(fixture_draft());
  assert_eq!(incident.severity, Severity::High);

  let suggestions = engine.suggest(&incident.incident_id).unwrap();
  let ranked: Vec<_> = suggestions
    .iter()
    .map(|s| (s.responder_id.as_str(), s.eta_minutes))
    .collect();
  assert_eq!(ranked, vec![("R-1KM", 1), ("R-2KM", 2), ("R-5KM", 5)]);
  assert!(suggestions
    .windows(2)
    .all(|w| w[0].distance_km <= w[1].distance_km));

  // Same inputs, same output.
  assert_eq!(engine.suggest(&incident.incident_id).unwrap(), suggestions);
}

#[test]
fn dispatch_to_en_route_responder_is_rejected_without_side_effects() {
  let (engine, _) = manual_engine();
  engine.register_responder(responder_north("R1", 1.0)).unwrap();

  let first = engine.ingest(fixture_draft());
  let second = engine.ingest(fixture_draft());
  engine.dispatch(&first.incident_id, "R1", 1).unwrap();

  let err = engine.dispatch(&second.incident_id, "R1", 1).unwrap_err();
  assert!(matches!(err, DispatchError::ResponderUnavailable(_)));

  let second_now = engine.incident(&second.incident_id).unwrap();
  assert_eq!(second_now.status, IncidentStatus::New);
  assert!(second_now.assigned_responder_id.is_none());
  assert!(second_now.eta_minutes.is_none());
}

#[test]
fn successful_dispatch_updates_both_sides() {
  let (engine, _) = manual_engine();
  engine.register_responder(responder_north("R1", 1.0)).unwrap();
  let inc = engine.ingest(fixture_draft());

  let dispatched = engine.dispatch(&inc.incident_id, "R1", 1).unwrap();
  assert_eq!(dispatched.assigned_responder_id.as_deref(), Some("R1"));
  assert_eq!(engine.responder("R1").unwrap().status, ResponderStatus::EnRoute);
  assert!(engine.list_available().is_empty());
}

#[test]
fn resolving_dispatched_incident_frees_responder() {
  let (engine, _) = manual_engine();
  engine.register_responder(responder_north("R1", 1.0)).unwrap();
  let inc = engine.ingest(fixture_draft());
  engine.acknowledge(&inc.incident_id).unwrap();
  engine.dispatch(&inc.incident_id, "R1", 1).unwrap();

  let resolved = engine.resolve(&inc.incident_id).unwrap();
  assert_eq!(resolved.status, IncidentStatus::Resolved);
  assert_eq!(engine.responder("R1").unwrap().status, ResponderStatus::Available);

  // Second resolve is a no-op success.
  assert_eq!(engine.resolve(&inc.incident_id).unwrap(), resolved);
  assert!(engine.list_active().is_empty());
}

#[test]
fn escalation_signaled_exactly_once() {
  let (engine, clock) = manual_engine();
  let mut rx = engine.subscribe();
  let inc = engine.ingest(fixture_draft());

  clock.advance(Duration::seconds(61));
  let report = engine.sweep();
  assert_eq!(report.escalations, vec![inc.incident_id.clone()]);

  clock.advance(Duration::seconds(9));
  assert!(engine.sweep().escalations.is_empty());

  let escalations: Vec<_> = drain(&mut rx)
    .into_iter()
    .filter(|e| matches!(e, Event::EscalationRequired { .. }))
    .collect();
  assert_eq!(escalations.len(), 1);
  match &escalations[0] {
    Event::EscalationRequired {
      incident_id,
      severity,
      age_secs,
      ..
    } => {
      assert_eq!(incident_id, &inc.incident_id);
      assert_eq!(*severity, Severity::High);
      assert_eq!(*age_secs, 61);
    }
    other => panic!("unexpected event {:?}", other),
  }

  // Scheduler surfaces the condition, operators own the status.
  assert_eq!(engine.incident(&inc.incident_id).unwrap().status, IncidentStatus::New);
}

#[test]
fn unseen_flag_expires_via_sweep() {
  let (engine, clock) = manual_engine();
  let inc = engine.ingest(fixture_draft());
  assert!(inc.is_unseen);

  clock.advance(Duration::seconds(5));
  engine.sweep();
  assert!(engine.incident(&inc.incident_id).unwrap().is_unseen);

  clock.advance(Duration::seconds(6));
  let report = engine.sweep();
  assert_eq!(report.alerts_expired, vec![inc.incident_id.clone()]);
  assert!(!engine.incident(&inc.incident_id).unwrap().is_unseen);
}

#[test]
fn invalid_edges_are_rejected() {
  let (engine, _) = manual_engine();
  engine.register_responder(responder_north("R1", 1.0)).unwrap();
  let inc = engine.ingest(fixture_draft());
  let id = inc.incident_id.as_str();

  // New -> Acknowledged (reassign) is not an edge.
  assert!(matches!(engine.reassign(id), Err(DispatchError::InvalidTransition { .. })));

  engine.dispatch(id, "R1", 1).unwrap();
  // Dispatched -> Acknowledged only via reassign.
  assert!(matches!(engine.acknowledge(id), Err(DispatchError::InvalidTransition { .. })));

  let back = engine.reassign(id).unwrap();
  assert_eq!(back.status, IncidentStatus::Acknowledged);
  assert_eq!(engine.responder("R1").unwrap().status, ResponderStatus::Available);
}

#[test]
fn events_follow_commit_order_per_incident() {
  let (engine, _) = manual_engine();
  engine.register_responder(responder_north("R1", 1.0)).unwrap();
  let mut rx = engine.subscribe();

  let inc = engine.ingest(fixture_draft());
  engine.acknowledge(&inc.incident_id).unwrap();
  engine.dispatch(&inc.incident_id, "R1", 1).unwrap();
  engine.resolve(&inc.incident_id).unwrap();

  let transitions: Vec<_> = drain(&mut rx)
    .into_iter()
    .filter_map(|e| match e {
      Event::IncidentCreated { .. } => Some(IncidentStatus::New),
      Event::StatusChanged { to, .. } => Some(to),
      _ => None,
    })
    .collect();
  assert_eq!(
    transitions,
    vec![
      IncidentStatus::New,
      IncidentStatus::Acknowledged,
      IncidentStatus::Dispatched,
      IncidentStatus::Resolved
    ]
  );
}

#[test]
fn concurrent_dispatch_never_double_books() {
  let (engine, _) = manual_engine();
  engine.register_responder(responder_north("R1", 1.0)).unwrap();

  let threads = 8;
  let ids: Vec<String> = (0..threads)
    .map(|_| engine.ingest(fixture_draft()).incident_id)
    .collect();
  let barrier = Arc::new(Barrier::new(threads));

  let handles: Vec<_> = ids
    .clone()
    .into_iter()
    .map(|id| {
      let engine = engine.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        engine.dispatch(&id, "R1", 1)
      })
    })
    .collect();

  let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
  let wins = results.iter().filter(|r| r.is_ok()).count();
  assert_eq!(wins, 1);
  assert!(results
    .iter()
    .filter_map(|r| r.as_ref().err())
    .all(|e| matches!(e, DispatchError::ResponderUnavailable(_))));

  let dispatched: Vec<_> = ids
    .iter()
    .map(|id| engine.incident(id).unwrap())
    .filter(|i| i.status == IncidentStatus::Dispatched)
    .collect();
  assert_eq!(dispatched.len(), 1);
  assert_eq!(dispatched[0].assigned_responder_id.as_deref(), Some("R1"));
  assert_eq!(engine.responder("R1").unwrap().status, ResponderStatus::EnRoute);
}

#[test]
fn assigned_responders_are_never_available() {
  let (engine, _) = manual_engine();
  for i in 0..4 {
    engine
      .register_responder(responder_north(&format!("R{}", i), i as f64 + 0.5))
      .unwrap();
  }
  let ids: Vec<_> = (0..6).map(|_| engine.ingest(fixture_draft()).incident_id).collect();
  for id in &ids {
    let _ = engine.dispatch_nearest(id);
  }
  engine.resolve(&ids[0]).unwrap();
  engine.reassign(&ids[1]).unwrap();

  for inc in engine.list_active() {
    if let Some(rid) = &inc.assigned_responder_id {
      assert_ne!(engine.responder(rid).unwrap().status, ResponderStatus::Available);
    }
  }
}

#[test]
fn scheduler_rejects_zero_sweep_interval() {
  let engine = Arc::new(Engine::new(Config {
    sweep_interval: StdDuration::ZERO,
    ..Config::default()
  }));
  let err = EscalationScheduler::spawn(engine).err().unwrap();
  assert!(matches!(err, DispatchError::Validation { .. }));
  assert!(err.to_string().contains("sweep_interval"));
}

#[tokio::test]
async fn background_scheduler_sweeps_and_shuts_down() {
  let config = Config {
    sweep_interval: StdDuration::from_millis(10),
    unseen_window: StdDuration::from_millis(0),
    ..Config::default()
  };
  let engine = Arc::new(Engine::new(config));
  let mut rx = engine.subscribe();
  let inc = engine.ingest(fixture_draft());

  let handle = EscalationScheduler::spawn(engine.clone()).unwrap();
  tokio::time::sleep(StdDuration::from_millis(60)).await;
  let sweeps = handle.shutdown().await;
  assert!(sweeps >= 1);

  assert!(!engine.incident(&inc.incident_id).unwrap().is_unseen);
  let expired = drain(&mut rx)
    .into_iter()
    .filter(|e| matches!(e, Event::AlertExpired { .. }))
    .count();
  assert_eq!(expired, 1);

  // No sweeps after shutdown: a fresh incident keeps its flag.
  let later = engine.ingest(fixture_draft());
  tokio::time::sleep(StdDuration::from_millis(30)).await;
  assert!(engine.incident(&later.incident_id).unwrap().is_unseen);
}
