//! Incident id minting: stable hex digest over the ingest sequence and origin.

use chrono::{DateTime, Utc};

/// Derive an incident id from the store's sequence number, the creation
/// instant and the reporting sensor. The sequence number alone guarantees
/// uniqueness within one store; the rest keeps ids from different stores apart.
pub fn mint_incident_id(sequence: u64, created_at: &DateTime<Utc>, sensor_source: &str) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(&sequence.to_be_bytes());
  hasher.update(b"|");
  hasher.update(created_at.to_rfc3339().as_bytes());
  hasher.update(b"|");
  hasher.update(sensor_source.as_bytes());
  let hex = hasher.finalize().to_hex();
  format!("INC-{}", &hex[..12])
}
