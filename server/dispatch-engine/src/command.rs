//! JSON-lines operator command contract for the CLI driver.
//!
//! One command per input line, tagged by `op`. Each command yields one JSON
//! value (the updated record, a listing, or a summary) or an `ErrorOutput`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::Engine;
use crate::error::DispatchError;
use crate::events::Event;
use crate::types::{IncidentDraft, Responder, ResponderStatus};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
  RegisterResponder {
    responder: Responder,
  },
  Ingest {
    incident: IncidentDraft,
  },
  Acknowledge {
    incident_id: String,
  },
  Dispatch {
    incident_id: String,
    responder_id: String,
    eta_minutes: u32,
  },
  DispatchNearest {
    incident_id: String,
  },
  Resolve {
    incident_id: String,
  },
  Reassign {
    incident_id: String,
  },
  MarkSeen {
    incident_id: String,
  },
  Suggest {
    incident_id: String,
    #[serde(default)]
    k: Option<usize>,
  },
  ListActive,
  ListAvailable,
  UpdatePosition {
    responder_id: String,
    latitude: f64,
    longitude: f64,
  },
  SetResponderStatus {
    responder_id: String,
    status: ResponderStatus,
  },
  Summary,
  Sweep,
}

impl Command {
  pub fn parse(line: &str) -> Result<Self, DispatchError> {
    Ok(serde_json::from_str(line)?)
  }
}

/// Run `cmd` against `engine` and render the result as JSON.
pub fn execute(engine: &Engine, cmd: Command) -> Result<Value, DispatchError> {
  let value = match cmd {
    Command::RegisterResponder { responder } => serde_json::to_value(engine.register_responder(responder)?)?,
    Command::Ingest { incident } => serde_json::to_value(engine.ingest(incident))?,
    Command::Acknowledge { incident_id } => serde_json::to_value(engine.acknowledge(&incident_id)?)?,
    Command::Dispatch {
      incident_id,
      responder_id,
      eta_minutes,
    } => serde_json::to_value(engine.dispatch(&incident_id, &responder_id, eta_minutes)?)?,
    Command::DispatchNearest { incident_id } => serde_json::to_value(engine.dispatch_nearest(&incident_id)?)?,
    Command::Resolve { incident_id } => serde_json::to_value(engine.resolve(&incident_id)?)?,
    Command::Reassign { incident_id } => serde_json::to_value(engine.reassign(&incident_id)?)?,
    Command::MarkSeen { incident_id } => serde_json::to_value(engine.mark_seen(&incident_id)?)?,
    Command::Suggest { incident_id, k } => {
      let k = k.unwrap_or(engine.config().suggestion_limit);
      serde_json::to_value(engine.suggest_top(&incident_id, k)?)?
    }
    Command::ListActive => serde_json::to_value(engine.list_active())?,
    Command::ListAvailable => serde_json::to_value(engine.list_available())?,
    Command::UpdatePosition {
      responder_id,
      latitude,
      longitude,
    } => serde_json::to_value(engine.update_position(&responder_id, latitude, longitude)?)?,
    Command::SetResponderStatus { responder_id, status } => {
      serde_json::to_value(engine.set_responder_status(&responder_id, status)?)?
    }
    Command::Summary => serde_json::to_value(engine.summary())?,
    Command::Sweep => serde_json::to_value(engine.sweep())?,
  };
  Ok(value)
}

// ---------------------------------------------------------------------------
// Output line wrappers
// ---------------------------------------------------------------------------

/// Structured error output for a rejected or unparsable command line.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub kind: String,
  pub message: String,
}

impl From<&DispatchError> for ErrorOutput {
  fn from(e: &DispatchError) -> Self {
    Self {
      error: true,
      kind: e.kind().to_string(),
      message: e.to_string(),
    }
  }
}

/// Bus notification as written to stdout.
#[derive(Debug, Clone, Serialize)]
pub struct EventOutput<'a> {
  pub event: &'a Event,
}
