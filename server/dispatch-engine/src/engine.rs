//! Shared dispatch engine: incident store, responder registry and event bus
//! behind one lock.
//!
//! Every operation, reads and scheduler sweeps included, runs inside the same
//! critical section. That makes `dispatch` all-or-nothing across both
//! collections and keeps event delivery in commit order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::DispatchError;
use crate::events::{Event, EventBus};
use crate::incidents::IncidentStore;
use crate::matcher;
use crate::responders::ResponderRegistry;
use crate::scheduler;
use crate::stats;
use crate::types::*;

struct State {
  incidents: IncidentStore,
  responders: ResponderRegistry,
  bus: EventBus,
}

pub struct Engine {
  config: Config,
  clock: Arc<dyn Clock>,
  state: Mutex<State>,
}

impl Engine {
  pub fn new(config: Config) -> Self {
    Self::with_clock(config, Arc::new(SystemClock))
  }

  pub fn with_defaults() -> Self {
    Self::new(Config::default())
  }

  pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
    let state = State {
      incidents: IncidentStore::new(config.unseen_window),
      responders: ResponderRegistry::new(),
      bus: EventBus::new(),
    };
    Self {
      config,
      clock,
      state: Mutex::new(state),
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  // Mutations validate before they write, so a panic mid-operation cannot
  // leave half an update behind; keep serving after a poisoned lock.
  fn lock(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
    self.lock().bus.subscribe()
  }

  // -------------------------------------------------------------------------
  // Incidents
  // -------------------------------------------------------------------------

  pub fn ingest(&self, draft: IncidentDraft) -> Incident {
    let now = self.clock.now();
    let state = &mut *self.lock();
    state.incidents.ingest(draft, now, &mut state.bus)
  }

  pub fn acknowledge(&self, id: &str) -> Result<Incident, DispatchError> {
    let now = self.clock.now();
    let state = &mut *self.lock();
    state.incidents.acknowledge(id, now, &mut state.bus)
  }

  pub fn dispatch(&self, id: &str, responder_id: &str, eta_minutes: u32) -> Result<Incident, DispatchError> {
    let now = self.clock.now();
    let state = &mut *self.lock();
    state
      .incidents
      .dispatch(id, &mut state.responders, responder_id, eta_minutes, now, &mut state.bus)
      .inspect_err(|e| warn!(incident_id = id, responder_id, error = %e, "dispatch rejected"))
  }

  /// Dispatch the top-ranked candidate with its computed ETA.
  pub fn dispatch_nearest(&self, id: &str) -> Result<Option<Incident>, DispatchError> {
    let now = self.clock.now();
    let state = &mut *self.lock();
    let incident = state.incidents.get(id)?;
    let best = matcher::suggest(
      incident,
      state.responders.list_available().iter(),
      1,
      self.config.assumed_speed_kmh,
    )
    .into_iter()
    .next();

    match best {
      Some(candidate) => state
        .incidents
        .dispatch(
          id,
          &mut state.responders,
          &candidate.responder_id,
          candidate.eta_minutes,
          now,
          &mut state.bus,
        )
        .map(Some),
      None => Ok(None),
    }
  }

  pub fn resolve(&self, id: &str) -> Result<Incident, DispatchError> {
    let now = self.clock.now();
    let state = &mut *self.lock();
    state
      .incidents
      .resolve(id, &mut state.responders, now, &mut state.bus)
  }

  pub fn reassign(&self, id: &str) -> Result<Incident, DispatchError> {
    let now = self.clock.now();
    let state = &mut *self.lock();
    state
      .incidents
      .reassign(id, &mut state.responders, now, &mut state.bus)
  }

  pub fn mark_seen(&self, id: &str) -> Result<Incident, DispatchError> {
    let now = self.clock.now();
    let state = &mut *self.lock();
    state.incidents.mark_seen(id, now, &mut state.bus)
  }

  pub fn incident(&self, id: &str) -> Result<Incident, DispatchError> {
    self.lock().incidents.get(id).cloned()
  }

  pub fn list_active(&self) -> Vec<Incident> {
    self.lock().incidents.list_active()
  }

  /// Ranked candidates for `id`, capped at the configured suggestion limit.
  pub fn suggest(&self, id: &str) -> Result<Vec<Suggestion>, DispatchError> {
    self.suggest_top(id, self.config.suggestion_limit)
  }

  pub fn suggest_top(&self, id: &str, k: usize) -> Result<Vec<Suggestion>, DispatchError> {
    let state = self.lock();
    let incident = state.incidents.get(id)?;
    Ok(matcher::suggest(
      incident,
      state.responders.list_available().iter(),
      k,
      self.config.assumed_speed_kmh,
    ))
  }

  // -------------------------------------------------------------------------
  // Responders
  // -------------------------------------------------------------------------

  pub fn register_responder(&self, responder: Responder) -> Result<Responder, DispatchError> {
    let registered = self.lock().responders.register(responder)?;
    info!(responder_id = %registered.responder_id, "responder joined fleet");
    Ok(registered)
  }

  pub fn responder(&self, id: &str) -> Result<Responder, DispatchError> {
    self.lock().responders.get(id).cloned()
  }

  pub fn list_responders(&self) -> Vec<Responder> {
    self.lock().responders.list()
  }

  pub fn list_available(&self) -> Vec<Responder> {
    self.lock().responders.list_available()
  }

  /// Force a responder back to `Available`. Refused while an active incident
  /// holds it; use `resolve` or `reassign` for those.
  pub fn release_responder(&self, id: &str) -> Result<Responder, DispatchError> {
    self.set_responder_status(id, ResponderStatus::Available)
  }

  /// Fleet-management status change. A responder held by an active incident
  /// may move between `EnRoute` and `Busy` but cannot become `Available` or
  /// `Offline` until the incident lets go of it.
  pub fn set_responder_status(&self, id: &str, status: ResponderStatus) -> Result<Responder, DispatchError> {
    let now = self.clock.now();
    let state = &mut *self.lock();
    let previous = state.responders.get(id)?.status;

    if matches!(status, ResponderStatus::Available | ResponderStatus::Offline) {
      if let Some(holder) = state.incidents.holder_of(id) {
        return Err(DispatchError::ResponderAssigned {
          responder_id: id.to_string(),
          incident_id: holder.incident_id.clone(),
        });
      }
    }

    let updated = match status {
      ResponderStatus::Available => state.responders.release(id)?,
      other => state.responders.set_status(id, other)?,
    };
    if previous != status {
      state.bus.publish(Event::ResponderStatusChanged {
        responder_id: id.to_string(),
        from: previous,
        to: status,
        at: now,
      });
    }
    Ok(updated)
  }

  pub fn update_position(&self, id: &str, latitude: f64, longitude: f64) -> Result<Responder, DispatchError> {
    let now = self.clock.now();
    let state = &mut *self.lock();
    let updated = state.responders.update_position(id, latitude, longitude)?;
    state.bus.publish(Event::ResponderMoved {
      responder_id: id.to_string(),
      latitude,
      longitude,
      at: now,
    });
    Ok(updated)
  }

  // -------------------------------------------------------------------------
  // Scheduler + dashboard
  // -------------------------------------------------------------------------

  /// Run one escalation sweep at the clock's current instant.
  pub fn sweep(&self) -> SweepReport {
    let now = self.clock.now();
    let state = &mut *self.lock();
    scheduler::sweep(&mut state.incidents, now, &self.config, &mut state.bus)
  }

  pub fn summary(&self) -> DispatchSummary {
    let state = self.lock();
    stats::summarize(&state.incidents, &state.responders)
  }
}
