//! UTM (Transverse Mercator, WGS84) ↔ geographic conversion.
//!
//! Both directions return `None` instead of failing: a missing or
//! unconvertible coordinate means "location unknown", which callers must
//! tolerate (e.g. by omitting a map marker).
//!
//! Series expansions follow Snyder, *Map Projections — A Working Manual*
//! (USGS PP 1395), §8; accuracy is well below a centimetre inside a zone.

use serde::{Deserialize, Serialize};

/// Zone used when a record carries no zone metadata.
pub const DEFAULT_ZONE_NUMBER: u8 = 23;
/// Latitude band used when a record carries no zone metadata (southern).
pub const DEFAULT_ZONE_LETTER: char = 'K';

const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Latitude band letters from 80°S upwards, 8° each (X spans 12°).
const BAND_LETTERS: &[u8] = b"CDEFGHJKLMNPQRSTUVWX";

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
  North,
  South,
}

impl Hemisphere {
  /// Derive the hemisphere from a latitude-band letter: `N` and above are
  /// northern. Unknown letters fall back to the deployment default (south).
  pub fn from_zone_letter(letter: char) -> Self {
    match letter.to_ascii_uppercase() {
      'N'..='X' => Self::North,
      _ => Self::South,
    }
  }

  pub fn from_latitude(lat: f64) -> Self {
    if lat >= 0.0 { Self::North } else { Self::South }
  }
}

impl Default for Hemisphere {
  fn default() -> Self { Self::South }
}

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub lat: f64,
  pub lon: f64,
}

/// Projected easting/northing in metres within a UTM zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projected {
  pub easting:  f64,
  pub northing: f64,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn e2() -> f64 { F * (2.0 - F) }

fn central_meridian(zone: u8) -> f64 { f64::from(zone) * 6.0 - 183.0 }

fn valid_zone(zone: u8) -> bool { (1..=60).contains(&zone) }

/// Meridional arc length from the equator to latitude `phi` (radians).
fn meridian_arc(phi: f64) -> f64 {
  let e2 = e2();
  let e4 = e2 * e2;
  let e6 = e4 * e2;
  A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
    - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
    + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
    - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// The latitude-band letter for `lat`, or `None` outside the UTM range
/// (80°S..84°N).
pub fn zone_letter(lat: f64) -> Option<char> {
  if !(-80.0..=84.0).contains(&lat) {
    return None;
  }
  let idx = (((lat + 80.0) / 8.0).floor() as usize).min(BAND_LETTERS.len() - 1);
  Some(BAND_LETTERS[idx] as char)
}

/// The standard zone number for `lon` (ignores the Norway/Svalbard
/// exceptions).
pub fn zone_number(lon: f64) -> Option<u8> {
  if !lon.is_finite() {
    return None;
  }
  let normalised = (lon + 180.0).rem_euclid(360.0);
  Some(((normalised / 6.0).floor() as u8).min(59) + 1)
}

// ─── Conversions ─────────────────────────────────────────────────────────────

/// Convert projected coordinates to latitude/longitude.
///
/// Returns `None` for non-finite input, a zone outside `1..=60`, or a result
/// outside the valid geographic range.
pub fn to_geographic(
  easting: f64,
  northing: f64,
  zone: u8,
  hemisphere: Hemisphere,
) -> Option<GeoPoint> {
  if !easting.is_finite() || !northing.is_finite() || !valid_zone(zone) {
    return None;
  }

  let e2 = e2();
  let ep2 = e2 / (1.0 - e2);
  let x = easting - FALSE_EASTING;
  let y = match hemisphere {
    Hemisphere::North => northing,
    Hemisphere::South => northing - FALSE_NORTHING_SOUTH,
  };

  let m = y / K0;
  let mu = m
    / (A * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0));
  let sq = (1.0 - e2).sqrt();
  let e1 = (1.0 - sq) / (1.0 + sq);

  let phi1 = mu
    + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
    + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
    + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
    + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

  let (sin1, cos1) = phi1.sin_cos();
  let tan1 = phi1.tan();
  let n1 = A / (1.0 - e2 * sin1 * sin1).sqrt();
  let t1 = tan1 * tan1;
  let c1 = ep2 * cos1 * cos1;
  let r1 = A * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
  let d = x / (n1 * K0);

  let lat = phi1
    - (n1 * tan1 / r1)
      * (d * d / 2.0
        - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4)
          / 24.0
        + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
          - 252.0 * ep2
          - 3.0 * c1 * c1)
          * d.powi(6)
          / 720.0);

  let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
    + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
      * d.powi(5)
      / 120.0)
    / cos1;

  let point = GeoPoint {
    lat: lat.to_degrees(),
    lon: central_meridian(zone) + lon.to_degrees(),
  };

  if point.lat.is_finite()
    && point.lon.is_finite()
    && point.lat.abs() <= 90.0
    && point.lon.abs() <= 180.0
  {
    Some(point)
  } else {
    None
  }
}

/// Convert latitude/longitude to projected coordinates in `zone`.
///
/// Returns `None` for non-finite input, out-of-range latitude/longitude, or a
/// zone outside `1..=60`.
pub fn to_projected(
  lat: f64,
  lon: f64,
  zone: u8,
  hemisphere: Hemisphere,
) -> Option<Projected> {
  if !lat.is_finite()
    || !lon.is_finite()
    || lat.abs() > 90.0
    || lon.abs() > 180.0
    || !valid_zone(zone)
  {
    return None;
  }

  let e2 = e2();
  let ep2 = e2 / (1.0 - e2);
  let phi = lat.to_radians();
  let dlambda = (lon - central_meridian(zone)).to_radians();

  let (sin, cos) = phi.sin_cos();
  let tan = phi.tan();
  let n = A / (1.0 - e2 * sin * sin).sqrt();
  let t = tan * tan;
  let c = ep2 * cos * cos;
  let a = cos * dlambda;
  let m = meridian_arc(phi);

  let easting = K0
    * n
    * (a
      + (1.0 - t + c) * a.powi(3) / 6.0
      + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
    + FALSE_EASTING;

  let mut northing = K0
    * (m
      + n * tan
        * (a * a / 2.0
          + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
          + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6)
            / 720.0));

  if hemisphere == Hemisphere::South {
    northing += FALSE_NORTHING_SOUTH;
  }

  Some(Projected { easting, northing })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  #[test]
  fn known_point_sao_paulo() {
    // Praça da Sé, São Paulo, zone 23K.
    let p = to_projected(-23.5505, -46.6333, 23, Hemisphere::South).unwrap();
    assert_abs_diff_eq!(p.easting, 333_287.0, epsilon = 5.0);
    assert_abs_diff_eq!(p.northing, 7_394_587.0, epsilon = 5.0);
  }

  #[test]
  fn central_meridian_on_equator() {
    let p = to_projected(0.0, -45.0, 23, Hemisphere::North).unwrap();
    assert_abs_diff_eq!(p.easting, 500_000.0, epsilon = 1e-6);
    assert_abs_diff_eq!(p.northing, 0.0, epsilon = 1e-6);
  }

  #[test]
  fn round_trip_southern_zone() {
    for (lat, lon) in [(-23.5505, -46.6333), (-19.9, -43.9), (-10.0, -47.5)] {
      let p = to_projected(lat, lon, 23, Hemisphere::South).unwrap();
      let g = to_geographic(p.easting, p.northing, 23, Hemisphere::South).unwrap();
      assert_abs_diff_eq!(g.lat, lat, epsilon = 1e-7);
      assert_abs_diff_eq!(g.lon, lon, epsilon = 1e-7);
    }
  }

  #[test]
  fn round_trip_northern_zone() {
    let p = to_projected(48.8584, 2.2945, 31, Hemisphere::North).unwrap();
    let g = to_geographic(p.easting, p.northing, 31, Hemisphere::North).unwrap();
    assert_abs_diff_eq!(g.lat, 48.8584, epsilon = 1e-7);
    assert_abs_diff_eq!(g.lon, 2.2945, epsilon = 1e-7);
  }

  #[test]
  fn conversions_are_pure() {
    let a = to_geographic(333_000.0, 7_394_000.0, 23, Hemisphere::South);
    let b = to_geographic(333_000.0, 7_394_000.0, 23, Hemisphere::South);
    assert_eq!(a, b);
  }

  #[test]
  fn invalid_input_yields_none() {
    assert!(to_geographic(f64::NAN, 7_394_000.0, 23, Hemisphere::South).is_none());
    assert!(to_geographic(333_000.0, f64::INFINITY, 23, Hemisphere::South).is_none());
    assert!(to_geographic(333_000.0, 7_394_000.0, 0, Hemisphere::South).is_none());
    assert!(to_geographic(333_000.0, 7_394_000.0, 61, Hemisphere::South).is_none());
    assert!(to_projected(91.0, 0.0, 31, Hemisphere::North).is_none());
    assert!(to_projected(0.0, f64::NAN, 31, Hemisphere::North).is_none());
  }

  #[test]
  fn zone_metadata_helpers() {
    assert_eq!(zone_letter(-23.55), Some('K'));
    assert_eq!(zone_letter(48.85), Some('U'));
    assert_eq!(zone_letter(84.0), Some('X'));
    assert_eq!(zone_letter(85.0), None);
    assert_eq!(zone_number(-46.63), Some(23));
    assert_eq!(zone_number(2.29), Some(31));
    assert_eq!(zone_number(180.0), Some(1));
    assert_eq!(Hemisphere::from_zone_letter('k'), Hemisphere::South);
    assert_eq!(Hemisphere::from_zone_letter('N'), Hemisphere::North);
  }
}
