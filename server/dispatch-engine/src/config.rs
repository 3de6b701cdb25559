//! Engine configuration with sane defaults.

use std::time::Duration;

use crate::error::DispatchError;

/// Tunable constants for matching and the escalation sweep.
#[derive(Debug, Clone)]
pub struct Config {
  /// Average road speed used to turn distance into an ETA.
  pub assumed_speed_kmh: f64,
  /// Max candidates returned by `suggest`.
  pub suggestion_limit: usize,
  /// Age after which the "unseen" alert flag clears on its own.
  pub unseen_window: Duration,
  /// Age after which a still-New high-severity incident needs escalation.
  pub escalation_window: Duration,
  /// Time between scheduler sweeps.
  pub sweep_interval: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      assumed_speed_kmh: 60.0,
      suggestion_limit: 3,
      unseen_window: Duration::from_secs(10),
      escalation_window: Duration::from_secs(60),
      sweep_interval: Duration::from_secs(5),
    }
  }
}

impl Config {
  /// Defaults overlaid with `DISPATCH_*` environment variables.
  pub fn from_env() -> Result<Self, DispatchError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Same as `from_env`, reading values through `lookup` instead of the process env.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, DispatchError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = Self::default();

    if let Some(v) = lookup("DISPATCH_ASSUMED_SPEED_KMH") {
      config.assumed_speed_kmh = parse_value("DISPATCH_ASSUMED_SPEED_KMH", &v)?;
    }
    if let Some(v) = lookup("DISPATCH_SUGGESTION_LIMIT") {
      config.suggestion_limit = parse_value("DISPATCH_SUGGESTION_LIMIT", &v)?;
    }
    if let Some(v) = lookup("DISPATCH_UNSEEN_WINDOW_SECS") {
      config.unseen_window = Duration::from_secs(parse_value("DISPATCH_UNSEEN_WINDOW_SECS", &v)?);
    }
    if let Some(v) = lookup("DISPATCH_ESCALATION_WINDOW_SECS") {
      config.escalation_window =
        Duration::from_secs(parse_value("DISPATCH_ESCALATION_WINDOW_SECS", &v)?);
    }
    if let Some(v) = lookup("DISPATCH_SWEEP_INTERVAL_SECS") {
      config.sweep_interval = Duration::from_secs(parse_value("DISPATCH_SWEEP_INTERVAL_SECS", &v)?);
    }

    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), DispatchError> {
    if !(self.assumed_speed_kmh.is_finite() && self.assumed_speed_kmh > 0.0) {
      return Err(DispatchError::validation(
        "assumed_speed_kmh",
        "must be a positive number",
      ));
    }
    if self.suggestion_limit == 0 {
      return Err(DispatchError::validation("suggestion_limit", "must be at least 1"));
    }
    if self.sweep_interval.is_zero() {
      return Err(DispatchError::validation("sweep_interval", "must be non-zero"));
    }
    Ok(())
  }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, DispatchError>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse()
    .map_err(|e| DispatchError::validation(key, &format!("invalid value {:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |key: &str| map.get(key).cloned()
  }

  #[test]
  fn defaults_match_reference_behavior() {
    let config = Config::default();
    assert_eq!(config.assumed_speed_kmh, 60.0);
    assert_eq!(config.suggestion_limit, 3);
    assert_eq!(config.unseen_window, Duration::from_secs(10));
    assert_eq!(config.escalation_window, Duration::from_secs(60));
    assert_eq!(config.sweep_interval, Duration::from_secs(5));
    assert!(config.validate().is_ok());
  }

  #[test]
  fn env_overrides_apply() {
    let config = Config::from_lookup(lookup_from(&[
      ("DISPATCH_ASSUMED_SPEED_KMH", "40"),
      ("DISPATCH_SUGGESTION_LIMIT", "5"),
      ("DISPATCH_ESCALATION_WINDOW_SECS", "120"),
    ]))
    .unwrap();
    assert_eq!(config.assumed_speed_kmh, 40.0);
    assert_eq!(config.suggestion_limit, 5);
    assert_eq!(config.escalation_window, Duration::from_secs(120));
    assert_eq!(config.unseen_window, Duration::from_secs(10));
  }

  #[test]
  fn unparsable_value_names_the_variable() {
    let err = Config::from_lookup(lookup_from(&[("DISPATCH_SUGGESTION_LIMIT", "many")])).unwrap_err();
    assert!(err.to_string().contains("DISPATCH_SUGGESTION_LIMIT"));
  }

  #[test]
  fn zero_speed_is_rejected() {
    let err = Config::from_lookup(lookup_from(&[("DISPATCH_ASSUMED_SPEED_KMH", "0")])).unwrap_err();
    assert!(err.to_string().contains("assumed_speed_kmh"));
  }
}
