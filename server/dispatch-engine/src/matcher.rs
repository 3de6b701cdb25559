//! Nearest-responder ranking for an incident.
//!
//! Candidates are available responders ordered by great-circle distance to the
//! incident, ties broken by responder id so identical inputs always rank the
//! same way. ETA assumes a constant average speed.

use crate::geo;
use crate::types::{Incident, Responder, ResponderStatus, Suggestion};

// Float noise tolerance, so exactly 1 km at 60 km/h stays 1 minute.
const ETA_EPSILON: f64 = 1e-9;

/// Minutes to cover `distance_km` at `speed_kmh`, rounded up.
pub fn eta_minutes(distance_km: f64, speed_kmh: f64) -> u32 {
  let minutes = (distance_km / speed_kmh * 60.0 - ETA_EPSILON).ceil();
  if minutes.is_finite() && minutes > 0.0 {
    minutes.min(u32::MAX as f64) as u32
  } else {
    0
  }
}

/// Rank up to `k` available responders for `incident`.
///
/// Returns an empty list when the incident already has a responder, is
/// resolved, or nobody is available. Responders whose position yields no
/// finite distance (NaN or infinite coordinates) cannot be ranked and are skipped.
pub fn suggest<'a, I>(incident: &Incident, responders: I, k: usize, speed_kmh: f64) -> Vec<Suggestion>
where
  I: IntoIterator<Item = &'a Responder>,
{
  if incident.assigned_responder_id.is_some() || !incident.status.is_active() {
    return Vec::new();
  }

  let mut ranked: Vec<Suggestion> = responders
    .into_iter()
    .filter(|r| r.status == ResponderStatus::Available)
    .filter_map(|r| {
      let distance_km = geo::distance_km(incident.latitude, incident.longitude, r.latitude, r.longitude);
      if !distance_km.is_finite() {
        return None;
      }
      Some(Suggestion {
        responder_id: r.responder_id.clone(),
        name: r.name.clone(),
        vehicle_id: r.vehicle_id.clone(),
        distance_km,
        eta_minutes: eta_minutes(distance_km, speed_kmh),
      })
    })
    .collect();

  ranked.sort_by(|a, b| {
    a.distance_km
      .total_cmp(&b.distance_km)
      .then_with(|| a.responder_id.cmp(&b.responder_id))
  });
  ranked.truncate(k);
  ranked
}
