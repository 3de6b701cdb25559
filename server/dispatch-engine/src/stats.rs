//! Dashboard counters over incidents and the responder fleet.

use crate::incidents::IncidentStore;
use crate::responders::ResponderRegistry;
use crate::types::*;

/// Count incidents per severity and status (resolved included) plus fleet availability.
pub fn summarize(incidents: &IncidentStore, responders: &ResponderRegistry) -> DispatchSummary {
  let mut summary = DispatchSummary {
    units_available: responders.count_available(),
    units_total: responders.len(),
    ..DispatchSummary::default()
  };

  for incident in incidents.all() {
    match incident.severity {
      Severity::High => summary.by_severity.high += 1,
      Severity::Medium => summary.by_severity.medium += 1,
      Severity::Low => summary.by_severity.low += 1,
    }
    match incident.status {
      IncidentStatus::New => summary.by_status.new += 1,
      IncidentStatus::Acknowledged => summary.by_status.acknowledged += 1,
      IncidentStatus::Dispatched => summary.by_status.dispatched += 1,
      IncidentStatus::Resolved => summary.by_status.resolved += 1,
    }
    if incident.severity == Severity::High && incident.status.is_active() {
      summary.active_high_severity += 1;
    }
  }

  summary
}
