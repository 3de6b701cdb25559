//! Structured error types for the dispatch engine.

use thiserror::Error;

use crate::types::IncidentStatus;

#[derive(Debug, Error)]
pub enum DispatchError {
  #[error("not found: {kind} {id}")]
  NotFound { kind: &'static str, id: String },

  #[error("invalid transition: incident {id} cannot go from {from:?} to {to:?}")]
  InvalidTransition {
    id: String,
    from: IncidentStatus,
    to: IncidentStatus,
  },

  #[error("responder unavailable: {0}")]
  ResponderUnavailable(String),

  #[error("responder {responder_id} is assigned to active incident {incident_id}")]
  ResponderAssigned {
    responder_id: String,
    incident_id: String,
  },

  #[error("duplicate responder: {0}")]
  DuplicateResponder(String),

  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl DispatchError {
  pub fn incident_not_found(id: &str) -> Self {
    Self::NotFound {
      kind: "incident",
      id: id.to_string(),
    }
  }

  pub fn responder_not_found(id: &str) -> Self {
    Self::NotFound {
      kind: "responder",
      id: id.to_string(),
    }
  }

  pub fn transition(id: &str, from: IncidentStatus, to: IncidentStatus) -> Self {
    Self::InvalidTransition {
      id: id.to_string(),
      from,
      to,
    }
  }

  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  /// Short machine-readable tag, used by the CLI error lines.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::NotFound { .. } => "not_found",
      Self::InvalidTransition { .. } => "invalid_transition",
      Self::ResponderUnavailable(_) => "responder_unavailable",
      Self::ResponderAssigned { .. } => "responder_assigned",
      Self::DuplicateResponder(_) => "duplicate_responder",
      Self::Validation { .. } => "validation",
      Self::Json(_) => "json",
    }
  }
}
