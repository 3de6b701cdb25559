//! Escalation scheduler: periodic sweep over active incidents.
//!
//! A sweep does two things:
//! - clears the "unseen" alert flag once an incident is older than the unseen window;
//! - flags still-New high-severity incidents older than the escalation window
//!   with a single `EscalationRequired` notification.
//!
//! It never changes incident status. Escalation is surfaced to operators, not acted on.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::DispatchError;
use crate::events::{Event, EventBus};
use crate::incidents::IncidentStore;
use crate::types::{IncidentStatus, Severity, SweepReport};

fn window(d: std::time::Duration) -> Duration {
  Duration::from_std(d).unwrap_or(Duration::MAX)
}

/// One sweep at instant `now`. Idempotent: a second sweep at the same or a
/// later instant never repeats a notification.
pub fn sweep(store: &mut IncidentStore, now: DateTime<Utc>, config: &Config, bus: &mut EventBus) -> SweepReport {
  let unseen_window = window(config.unseen_window);
  let escalation_window = window(config.escalation_window);
  let mut report = SweepReport::default();

  for incident in store.active_mut() {
    let age = now - incident.created_at;

    if incident.is_unseen && age > unseen_window {
      incident.is_unseen = false;
      report.alerts_expired.push(incident.incident_id.clone());
      bus.publish(Event::AlertExpired {
        incident_id: incident.incident_id.clone(),
        at: now,
      });
    }

    if incident.status == IncidentStatus::New
      && incident.severity == Severity::High
      && !incident.escalation_signaled
      && age > escalation_window
    {
      incident.escalation_signaled = true;
      warn!(
        incident_id = %incident.incident_id,
        age_secs = age.num_seconds(),
        "high-severity incident still unacknowledged, escalation required"
      );
      report.escalations.push(incident.incident_id.clone());
      bus.publish(Event::EscalationRequired {
        incident_id: incident.incident_id.clone(),
        severity: incident.severity,
        age_secs: age.num_seconds(),
        at: now,
      });
    }
  }

  if !report.is_empty() {
    debug!(
      expired = report.alerts_expired.len(),
      escalations = report.escalations.len(),
      "sweep applied"
    );
  }
  report
}

/// Background driver that calls `Engine::sweep` every `sweep_interval`.
pub struct EscalationScheduler;

impl EscalationScheduler {
  /// Start sweeping on the current tokio runtime. Fails with `Validation`
  /// when the engine's config is unusable (e.g. a zero sweep interval).
  pub fn spawn(engine: Arc<Engine>) -> Result<SchedulerHandle, DispatchError> {
    engine.config().validate()?;
    let period = engine.config().sweep_interval;
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      let mut sweeps: u64 = 0;
      info!(interval_ms = period.as_millis() as u64, "escalation scheduler started");

      loop {
        tokio::select! {
          _ = ticker.tick() => {
            engine.sweep();
            sweeps += 1;
          }
          changed = shutdown_rx.changed() => {
            if changed.is_err() || *shutdown_rx.borrow() {
              break;
            }
          }
        }
      }

      info!(sweeps, "escalation scheduler stopped");
      sweeps
    });

    Ok(SchedulerHandle {
      shutdown: shutdown_tx,
      task,
    })
  }
}

/// Owner handle for a running scheduler.
pub struct SchedulerHandle {
  shutdown: watch::Sender<bool>,
  task: JoinHandle<u64>,
}

impl SchedulerHandle {
  /// Stop issuing sweeps and wait for the task to finish. A sweep in progress
  /// completes first. Returns the number of sweeps run.
  pub async fn shutdown(self) -> u64 {
    let _ = self.shutdown.send(true);
    match self.task.await {
      Ok(sweeps) => sweeps,
      Err(e) => {
        warn!("escalation scheduler task failed: {}", e);
        0
      }
    }
  }
}
