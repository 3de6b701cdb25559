//! Outgoing notifications and their fan-out to subscribers.
//!
//! The bus is owned by the engine's locked state, so events are published in
//! the order the mutations committed. Each subscriber gets its own unbounded
//! channel; a dropped receiver is pruned on the next publish.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::types::{Incident, IncidentStatus, ResponderStatus, Severity};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
  IncidentCreated {
    incident: Incident,
  },
  StatusChanged {
    incident_id: String,
    from: IncidentStatus,
    to: IncidentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    responder_id: Option<String>,
    at: DateTime<Utc>,
  },
  IncidentSeen {
    incident_id: String,
    at: DateTime<Utc>,
  },
  AlertExpired {
    incident_id: String,
    at: DateTime<Utc>,
  },
  EscalationRequired {
    incident_id: String,
    severity: Severity,
    age_secs: i64,
    at: DateTime<Utc>,
  },
  ResponderStatusChanged {
    responder_id: String,
    from: ResponderStatus,
    to: ResponderStatus,
    at: DateTime<Utc>,
  },
  ResponderMoved {
    responder_id: String,
    latitude: f64,
    longitude: f64,
    at: DateTime<Utc>,
  },
}

impl Event {
  /// Incident the event is about, if any.
  pub fn incident_id(&self) -> Option<&str> {
    match self {
      Self::IncidentCreated { incident } => Some(&incident.incident_id),
      Self::StatusChanged { incident_id, .. }
      | Self::IncidentSeen { incident_id, .. }
      | Self::AlertExpired { incident_id, .. }
      | Self::EscalationRequired { incident_id, .. } => Some(incident_id),
      Self::ResponderStatusChanged { .. } | Self::ResponderMoved { .. } => None,
    }
  }
}

#[derive(Debug, Default)]
pub struct EventBus {
  subscribers: Vec<mpsc::UnboundedSender<Event>>,
}

impl EventBus {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    self.subscribers.push(tx);
    rx
  }

  pub fn publish(&mut self, event: Event) {
    self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
  }

  pub fn subscriber_count(&self) -> usize {
    self.subscribers.len()
  }
}
