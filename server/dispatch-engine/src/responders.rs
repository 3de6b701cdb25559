//! Responder fleet: canonical records and availability transitions.
//!
//! The registry alone does not know about incidents. Callers that must keep
//! assignments consistent (the engine) mutate it under the same lock as the
//! incident store.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::DispatchError;
use crate::types::{Responder, ResponderStatus};

#[derive(Debug, Default)]
pub struct ResponderRegistry {
  // Keyed by id so listings come out in a stable order.
  responders: BTreeMap<String, Responder>,
}

impl ResponderRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, responder: Responder) -> Result<Responder, DispatchError> {
    if self.responders.contains_key(&responder.responder_id) {
      return Err(DispatchError::DuplicateResponder(responder.responder_id));
    }
    debug!(responder_id = %responder.responder_id, status = ?responder.status, "responder registered");
    self
      .responders
      .insert(responder.responder_id.clone(), responder.clone());
    Ok(responder)
  }

  pub fn get(&self, id: &str) -> Result<&Responder, DispatchError> {
    self
      .responders
      .get(id)
      .ok_or_else(|| DispatchError::responder_not_found(id))
  }

  fn get_mut(&mut self, id: &str) -> Result<&mut Responder, DispatchError> {
    self
      .responders
      .get_mut(id)
      .ok_or_else(|| DispatchError::responder_not_found(id))
  }

  /// All responders, ordered by id.
  pub fn list(&self) -> Vec<Responder> {
    self.responders.values().cloned().collect()
  }

  /// Responders currently `Available`, ordered by id.
  pub fn list_available(&self) -> Vec<Responder> {
    self
      .responders
      .values()
      .filter(|r| r.status == ResponderStatus::Available)
      .cloned()
      .collect()
  }

  pub fn count_available(&self) -> usize {
    self
      .responders
      .values()
      .filter(|r| r.status == ResponderStatus::Available)
      .count()
  }

  pub fn len(&self) -> usize {
    self.responders.len()
  }

  pub fn is_empty(&self) -> bool {
    self.responders.is_empty()
  }

  /// Take an `Available` responder and mark it `EnRoute`.
  pub fn reserve(&mut self, id: &str) -> Result<Responder, DispatchError> {
    let responder = self.get_mut(id)?;
    if responder.status != ResponderStatus::Available {
      return Err(DispatchError::ResponderUnavailable(id.to_string()));
    }
    responder.status = ResponderStatus::EnRoute;
    Ok(responder.clone())
  }

  /// Return a responder to `Available` whatever its current state.
  pub fn release(&mut self, id: &str) -> Result<Responder, DispatchError> {
    let responder = self.get_mut(id)?;
    responder.status = ResponderStatus::Available;
    Ok(responder.clone())
  }

  pub fn set_status(&mut self, id: &str, status: ResponderStatus) -> Result<Responder, DispatchError> {
    let responder = self.get_mut(id)?;
    responder.status = status;
    Ok(responder.clone())
  }

  pub fn update_position(&mut self, id: &str, latitude: f64, longitude: f64) -> Result<Responder, DispatchError> {
    let responder = self.get_mut(id)?;
    responder.latitude = latitude;
    responder.longitude = longitude;
    Ok(responder.clone())
  }
}
