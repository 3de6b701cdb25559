//! Incident store: canonical incident records and the status state machine.
//!
//! ```text
//!   New ──> Acknowledged ──> Dispatched ──> Resolved
//!    │            ^               │             ^
//!    │            └── reassign ───┘             │
//!    └──────────────── resolve (any state) ─────┘
//! ```
//!
//! Operations that also touch the fleet take the registry by `&mut`, validate
//! everything first and only then apply, so a failed call changes nothing.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::DispatchError;
use crate::events::{Event, EventBus};
use crate::ids;
use crate::responders::ResponderRegistry;
use crate::types::*;

#[derive(Debug)]
pub struct IncidentStore {
  /// Insertion order; incidents are never removed.
  incidents: Vec<Incident>,
  index: HashMap<String, usize>,
  sequence: u64,
  unseen_window: Duration,
}

impl IncidentStore {
  pub fn new(unseen_window: std::time::Duration) -> Self {
    Self {
      incidents: Vec::new(),
      index: HashMap::new(),
      sequence: 0,
      unseen_window: Duration::from_std(unseen_window).unwrap_or(Duration::MAX),
    }
  }

  fn position(&self, id: &str) -> Result<usize, DispatchError> {
    self
      .index
      .get(id)
      .copied()
      .ok_or_else(|| DispatchError::incident_not_found(id))
  }

  pub fn get(&self, id: &str) -> Result<&Incident, DispatchError> {
    let pos = self.position(id)?;
    Ok(&self.incidents[pos])
  }

  /// Every incident ever ingested, in insertion order.
  pub fn all(&self) -> &[Incident] {
    &self.incidents
  }

  /// Non-resolved incidents, in insertion order.
  pub fn list_active(&self) -> Vec<Incident> {
    self
      .incidents
      .iter()
      .filter(|i| i.status.is_active())
      .cloned()
      .collect()
  }

  pub(crate) fn active_mut(&mut self) -> impl Iterator<Item = &mut Incident> {
    self.incidents.iter_mut().filter(|i| i.status.is_active())
  }

  pub fn len(&self) -> usize {
    self.incidents.len()
  }

  pub fn is_empty(&self) -> bool {
    self.incidents.is_empty()
  }

  pub fn ingest(&mut self, draft: IncidentDraft, now: DateTime<Utc>, bus: &mut EventBus) -> Incident {
    self.sequence += 1;
    let mut incident_id = ids::mint_incident_id(self.sequence, &now, &draft.sensor_source);
    // A truncated digest can in principle collide; bump the sequence until it doesn't.
    while self.index.contains_key(&incident_id) {
      self.sequence += 1;
      incident_id = ids::mint_incident_id(self.sequence, &now, &draft.sensor_source);
    }

    let incident = Incident {
      incident_id: incident_id.clone(),
      created_at: now,
      alert_expires_at: now
        .checked_add_signed(self.unseen_window)
        .unwrap_or(DateTime::<Utc>::MAX_UTC),
      severity: draft.severity,
      status: IncidentStatus::New,
      latitude: draft.latitude,
      longitude: draft.longitude,
      speed_kmh: draft.speed_kmh.max(0.0),
      peak_accel_g: draft.peak_accel_g.max(0.0),
      peak_gyro_dps: draft.peak_gyro_dps.max(0.0),
      address: draft.address,
      sensor_source: draft.sensor_source,
      report_type: draft.report_type,
      sent_via: draft.sent_via,
      victim_name: draft.victim_name,
      victim_age: draft.victim_age,
      notes: draft.notes,
      assigned_responder_id: None,
      eta_minutes: None,
      vehicle_id: None,
      is_unseen: true,
      escalation_signaled: false,
      resolved_at: None,
    };

    info!(
      incident_id = %incident.incident_id,
      severity = ?incident.severity,
      lat = incident.latitude,
      lng = incident.longitude,
      "incident ingested"
    );

    self.index.insert(incident_id, self.incidents.len());
    self.incidents.push(incident.clone());
    bus.publish(Event::IncidentCreated {
      incident: incident.clone(),
    });
    incident
  }

  pub fn acknowledge(&mut self, id: &str, now: DateTime<Utc>, bus: &mut EventBus) -> Result<Incident, DispatchError> {
    let pos = self.position(id)?;
    let incident = &mut self.incidents[pos];
    if incident.status != IncidentStatus::New {
      return Err(DispatchError::transition(id, incident.status, IncidentStatus::Acknowledged));
    }

    incident.status = IncidentStatus::Acknowledged;
    incident.is_unseen = false;
    info!(incident_id = id, "incident acknowledged");

    bus.publish(Event::StatusChanged {
      incident_id: id.to_string(),
      from: IncidentStatus::New,
      to: IncidentStatus::Acknowledged,
      responder_id: None,
      at: now,
    });
    Ok(incident.clone())
  }

  /// Assign `responder_id` and reserve it in `responders` in one step.
  pub fn dispatch(
    &mut self,
    id: &str,
    responders: &mut ResponderRegistry,
    responder_id: &str,
    eta_minutes: u32,
    now: DateTime<Utc>,
    bus: &mut EventBus,
  ) -> Result<Incident, DispatchError> {
    let pos = self.position(id)?;
    let from = self.incidents[pos].status;
    if !matches!(from, IncidentStatus::New | IncidentStatus::Acknowledged) {
      return Err(DispatchError::transition(id, from, IncidentStatus::Dispatched));
    }

    // Last fallible step: nothing has been written if it fails.
    let responder = responders.reserve(responder_id)?;

    let incident = &mut self.incidents[pos];
    incident.status = IncidentStatus::Dispatched;
    incident.assigned_responder_id = Some(responder.responder_id.clone());
    incident.eta_minutes = Some(eta_minutes);
    incident.vehicle_id = Some(responder.vehicle_id.clone()).filter(|v| !v.is_empty());
    info!(
      incident_id = id,
      responder_id,
      eta_minutes,
      "responder dispatched"
    );

    bus.publish(Event::StatusChanged {
      incident_id: id.to_string(),
      from,
      to: IncidentStatus::Dispatched,
      responder_id: Some(responder.responder_id.clone()),
      at: now,
    });
    bus.publish(Event::ResponderStatusChanged {
      responder_id: responder.responder_id,
      from: ResponderStatus::Available,
      to: ResponderStatus::EnRoute,
      at: now,
    });
    Ok(incident.clone())
  }

  /// Close an incident from any state and free its responder.
  ///
  /// Resolving an already-resolved incident is a no-op that returns the record
  /// unchanged and publishes nothing.
  pub fn resolve(
    &mut self,
    id: &str,
    responders: &mut ResponderRegistry,
    now: DateTime<Utc>,
    bus: &mut EventBus,
  ) -> Result<Incident, DispatchError> {
    let pos = self.position(id)?;
    let from = self.incidents[pos].status;
    if from == IncidentStatus::Resolved {
      debug!(incident_id = id, "resolve on resolved incident ignored");
      return Ok(self.incidents[pos].clone());
    }

    let released = match self.incidents[pos].assigned_responder_id.clone() {
      Some(rid) => {
        let previous = responders.get(&rid)?.status;
        responders.release(&rid)?;
        Some((rid, previous))
      }
      None => None,
    };

    let incident = &mut self.incidents[pos];
    incident.status = IncidentStatus::Resolved;
    incident.is_unseen = false;
    incident.resolved_at = Some(now);
    info!(incident_id = id, from = ?from, "incident resolved");

    bus.publish(Event::StatusChanged {
      incident_id: id.to_string(),
      from,
      to: IncidentStatus::Resolved,
      responder_id: incident.assigned_responder_id.clone(),
      at: now,
    });
    if let Some((rid, previous)) = released {
      if previous != ResponderStatus::Available {
        bus.publish(Event::ResponderStatusChanged {
          responder_id: rid,
          from: previous,
          to: ResponderStatus::Available,
          at: now,
        });
      }
    }
    Ok(incident.clone())
  }

  /// Undo a dispatch: back to `Acknowledged`, assignment cleared, responder freed.
  pub fn reassign(
    &mut self,
    id: &str,
    responders: &mut ResponderRegistry,
    now: DateTime<Utc>,
    bus: &mut EventBus,
  ) -> Result<Incident, DispatchError> {
    let pos = self.position(id)?;
    let from = self.incidents[pos].status;
    if from != IncidentStatus::Dispatched {
      return Err(DispatchError::transition(id, from, IncidentStatus::Acknowledged));
    }

    let released = match self.incidents[pos].assigned_responder_id.clone() {
      Some(rid) => {
        let previous = responders.get(&rid)?.status;
        responders.release(&rid)?;
        Some((rid, previous))
      }
      None => None,
    };

    let incident = &mut self.incidents[pos];
    incident.status = IncidentStatus::Acknowledged;
    incident.assigned_responder_id = None;
    incident.eta_minutes = None;
    incident.vehicle_id = None;
    info!(incident_id = id, "dispatch cancelled, awaiting reassignment");

    bus.publish(Event::StatusChanged {
      incident_id: id.to_string(),
      from,
      to: IncidentStatus::Acknowledged,
      responder_id: None,
      at: now,
    });
    if let Some((rid, previous)) = released {
      if previous != ResponderStatus::Available {
        bus.publish(Event::ResponderStatusChanged {
          responder_id: rid,
          from: previous,
          to: ResponderStatus::Available,
          at: now,
        });
      }
    }
    Ok(incident.clone())
  }

  pub fn mark_seen(&mut self, id: &str, now: DateTime<Utc>, bus: &mut EventBus) -> Result<Incident, DispatchError> {
    let pos = self.position(id)?;
    let incident = &mut self.incidents[pos];
    if incident.is_unseen {
      incident.is_unseen = false;
      bus.publish(Event::IncidentSeen {
        incident_id: id.to_string(),
        at: now,
      });
    }
    Ok(incident.clone())
  }

  /// Active incident currently holding `responder_id`, if any.
  pub fn holder_of(&self, responder_id: &str) -> Option<&Incident> {
    self.incidents.iter().find(|i| {
      i.status.is_active() && i.assigned_responder_id.as_deref() == Some(responder_id)
    })
  }
}
