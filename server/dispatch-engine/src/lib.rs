//! Emergency dispatch engine: triage, lifecycle and nearest-responder matching.
//!
//! Incidents arrive from sensor feeds, move through
//! New → Acknowledged → Dispatched → Resolved, and are matched against the
//! responder fleet by great-circle distance. A periodic sweep clears stale
//! "unseen" alert flags and surfaces aged high-severity incidents.
//!
//! No DB, no network; in-memory state behind a single lock.

pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod geo;
pub mod ids;
pub mod incidents;
pub mod matcher;
pub mod responders;
pub mod scheduler;
pub mod stats;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::Engine;
pub use error::DispatchError;
pub use events::{Event, EventBus};
pub use scheduler::{EscalationScheduler, SchedulerHandle};
pub use types::{Incident, IncidentDraft, IncidentStatus, Responder, ResponderStatus, Severity, Suggestion};
