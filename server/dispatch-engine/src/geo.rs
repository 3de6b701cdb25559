//! Pure position math: great-circle distance and percentage projection.

/// Mean earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two lat/lng points, in kilometres.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
  let d_lat = (lat2 - lat1).to_radians();
  let d_lng = (lng2 - lng1).to_radians();
  let a = (d_lat / 2.0).sin().powi(2)
    + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
  // Rounding can push `a` a hair past 1.0 for antipodal points.
  let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
  EARTH_RADIUS_KM * c
}

/// Linear projection of `value` from [min, max] into [0, 100], clamped.
///
/// A degenerate range (`max <= min`) maps everything to 0.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
  if max <= min {
    return 0.0;
  }
  ((value - min) / (max - min) * 100.0).clamp(0.0, 100.0)
}
