//! Core types for the dispatch engine (caller contracts + internal records).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
  High,
  Medium,
  Low,
}

/// Incident lifecycle. Declaration order is the forward order of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IncidentStatus {
  New,
  Acknowledged,
  Dispatched,
  Resolved,
}

impl IncidentStatus {
  pub fn is_active(self) -> bool {
    self != Self::Resolved
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponderStatus {
  Available,
  EnRoute,
  Busy,
  Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
  #[default]
  Auto,
  Manual,
}

/// Uplink the sensor report arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SentVia {
  #[default]
  Gsm,
  LoRa,
  Satellite,
}

// ---------------------------------------------------------------------------
// Inbound types (what the ingestion collaborator sends)
// ---------------------------------------------------------------------------

/// Everything immutable about an incident; the store assigns identity and time.
#[derive(Debug, Clone, Deserialize)]
pub struct IncidentDraft {
  pub severity: Severity,
  pub latitude: f64,
  pub longitude: f64,
  #[serde(default)]
  pub speed_kmh: f64,
  #[serde(default)]
  pub peak_accel_g: f64,
  #[serde(default)]
  pub peak_gyro_dps: f64,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub sensor_source: String,
  #[serde(default)]
  pub report_type: ReportType,
  #[serde(default)]
  pub sent_via: SentVia,
  #[serde(default)]
  pub victim_name: Option<String>,
  #[serde(default)]
  pub victim_age: Option<u32>,
  #[serde(default)]
  pub notes: String,
}

impl IncidentDraft {
  /// Minimal draft: severity and position, everything else defaulted.
  pub fn new(severity: Severity, latitude: f64, longitude: f64) -> Self {
    Self {
      severity,
      latitude,
      longitude,
      speed_kmh: 0.0,
      peak_accel_g: 0.0,
      peak_gyro_dps: 0.0,
      address: String::new(),
      sensor_source: String::new(),
      report_type: ReportType::Auto,
      sent_via: SentVia::Gsm,
      victim_name: None,
      victim_age: None,
      notes: String::new(),
    }
  }
}

// ---------------------------------------------------------------------------
// Canonical records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
  pub incident_id: String,
  pub created_at: DateTime<Utc>,
  pub alert_expires_at: DateTime<Utc>,
  pub severity: Severity,
  pub status: IncidentStatus,
  pub latitude: f64,
  pub longitude: f64,
  pub speed_kmh: f64,
  pub peak_accel_g: f64,
  pub peak_gyro_dps: f64,
  pub address: String,
  pub sensor_source: String,
  pub report_type: ReportType,
  pub sent_via: SentVia,
  pub victim_name: Option<String>,
  pub victim_age: Option<u32>,
  pub notes: String,
  pub assigned_responder_id: Option<String>,
  pub eta_minutes: Option<u32>,
  /// Vehicle of the assigned responder, copied at dispatch time.
  pub vehicle_id: Option<String>,
  pub is_unseen: bool,
  /// Set once an `EscalationRequired` notification went out for this incident.
  pub escalation_signaled: bool,
  pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Responder {
  pub responder_id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub vehicle_id: String,
  pub status: ResponderStatus,
  pub latitude: f64,
  pub longitude: f64,
  #[serde(default)]
  pub battery_pct: u8,
}

impl Responder {
  pub fn new(responder_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
    Self {
      responder_id: responder_id.into(),
      name: String::new(),
      vehicle_id: String::new(),
      status: ResponderStatus::Available,
      latitude,
      longitude,
      battery_pct: 100,
    }
  }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One ranked dispatch candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
  pub responder_id: String,
  pub name: String,
  pub vehicle_id: String,
  pub distance_km: f64,
  pub eta_minutes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
  pub high: usize,
  pub medium: usize,
  pub low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
  pub new: usize,
  pub acknowledged: usize,
  pub dispatched: usize,
  pub resolved: usize,
}

/// Dashboard counters over the whole incident history and the fleet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
  pub by_severity: SeverityCounts,
  pub by_status: StatusCounts,
  pub active_high_severity: usize,
  pub units_available: usize,
  pub units_total: usize,
}

/// Outcome of one scheduler sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub alerts_expired: Vec<String>,
  pub escalations: Vec<String>,
}

impl SweepReport {
  pub fn is_empty(&self) -> bool {
    self.alerts_expired.is_empty() && self.escalations.is_empty()
  }
}
