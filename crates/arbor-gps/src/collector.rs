//! [`FixCollector`]: the capture state machine without any I/O.
//!
//! `Idle → Capturing → Averaging → Done | Failed`. Time is passed in by the
//! caller so the machine can be driven by a real clock or a paused one.

use std::time::Duration;

use arbor_core::coords::{self, DEFAULT_ZONE_LETTER, GeoPoint, Hemisphere, Projected};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{CaptureError, Result};

/// Default length of the capture window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);
/// Fixes reporting an accuracy at or above this many metres are discarded.
pub const DEFAULT_MAX_ACCURACY_M: f64 = 150.0;
/// Default interval between remaining-time updates.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// A single raw position reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
  pub lat:        f64,
  pub lon:        f64,
  /// Reported horizontal accuracy radius in metres.
  pub accuracy_m: f64,
}

impl Fix {
  pub fn new(lat: f64, lon: f64, accuracy_m: f64) -> Self { Self { lat, lon, accuracy_m } }

  fn is_plausible(&self) -> bool {
    self.lat.is_finite()
      && self.lon.is_finite()
      && self.accuracy_m.is_finite()
      && self.accuracy_m >= 0.0
      && self.lat.abs() <= 90.0
      && self.lon.abs() <= 180.0
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureConfig {
  pub window:         Duration,
  pub max_accuracy_m: f64,
  pub tick:           Duration,
  /// Zone used to project the averaged position.
  pub zone_number:    u8,
}

impl Default for CaptureConfig {
  fn default() -> Self {
    Self {
      window:         DEFAULT_WINDOW,
      max_accuracy_m: DEFAULT_MAX_ACCURACY_M,
      tick:           DEFAULT_TICK,
      zone_number:    coords::DEFAULT_ZONE_NUMBER,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
  Idle,
  Capturing,
  Averaging,
  Done,
  Failed,
}

/// The averaged result of a capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
  pub position:    GeoPoint,
  /// Mean reported accuracy of the retained fixes.
  pub accuracy_m:  f64,
  pub fix_count:   usize,
  pub zone_number: u8,
  pub zone_letter: char,
  /// `None` when the averaged position cannot be projected into the zone.
  pub projected:   Option<Projected>,
}

#[derive(Debug)]
pub struct FixCollector {
  config:   CaptureConfig,
  state:    CaptureState,
  deadline: Option<Instant>,
  fixes:    Vec<Fix>,
}

impl FixCollector {
  pub fn new(config: CaptureConfig) -> Self {
    Self { config, state: CaptureState::Idle, deadline: None, fixes: Vec::new() }
  }

  pub fn config(&self) -> &CaptureConfig { &self.config }

  pub fn state(&self) -> CaptureState { self.state }

  pub fn deadline(&self) -> Option<Instant> { self.deadline }

  pub fn fix_count(&self) -> usize { self.fixes.len() }

  /// Open the window at `now`. Has no effect unless idle.
  pub fn start(&mut self, now: Instant) {
    if self.state == CaptureState::Idle {
      self.state = CaptureState::Capturing;
      self.deadline = Some(now + self.config.window);
    }
  }

  /// Offer a fix. Returns `true` if it was retained.
  ///
  /// Fixes are only taken while capturing; anything arriving afterwards is
  /// dropped.
  pub fn offer(&mut self, fix: Fix) -> bool {
    if self.state != CaptureState::Capturing {
      debug!(?fix, state = ?self.state, "ignoring fix outside capture window");
      return false;
    }
    if !fix.is_plausible() || fix.accuracy_m >= self.config.max_accuracy_m {
      debug!(?fix, max = self.config.max_accuracy_m, "discarding imprecise fix");
      return false;
    }
    self.fixes.push(fix);
    true
  }

  /// Time left in the window at `now`; zero once closed, never negative.
  pub fn remaining(&self, now: Instant) -> Duration {
    match (self.state, self.deadline) {
      (CaptureState::Idle, _) => self.config.window,
      (CaptureState::Capturing, Some(deadline)) => deadline.saturating_duration_since(now),
      _ => Duration::ZERO,
    }
  }

  /// Close the window. Safe to call repeatedly.
  pub fn close(&mut self) {
    if matches!(self.state, CaptureState::Idle | CaptureState::Capturing) {
      self.state = CaptureState::Averaging;
    }
  }

  /// Average the retained fixes into a [`Reading`], closing the window
  /// first if needed.
  pub fn finish(&mut self) -> Result<Reading> {
    self.close();
    if self.fixes.is_empty() {
      self.state = CaptureState::Failed;
      return Err(CaptureError::NoSignal);
    }

    let n = self.fixes.len() as f64;
    let (lat, lon, acc) = self
      .fixes
      .iter()
      .fold((0.0, 0.0, 0.0), |(la, lo, ac), f| (la + f.lat, lo + f.lon, ac + f.accuracy_m));
    let position = GeoPoint { lat: lat / n, lon: lon / n };

    let zone_number = self.config.zone_number;
    let zone_letter = coords::zone_letter(position.lat).unwrap_or(DEFAULT_ZONE_LETTER);
    let projected = coords::to_projected(
      position.lat,
      position.lon,
      zone_number,
      Hemisphere::from_zone_letter(zone_letter),
    );

    self.state = CaptureState::Done;
    Ok(Reading {
      position,
      accuracy_m: acc / n,
      fix_count: self.fixes.len(),
      zone_number,
      zone_letter,
      projected,
    })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  fn collector() -> (FixCollector, Instant) {
    let now = Instant::now();
    let mut c = FixCollector::new(CaptureConfig::default());
    c.start(now);
    (c, now)
  }

  #[test]
  fn averages_retained_fixes() {
    let (mut c, _) = collector();
    assert!(c.offer(Fix::new(-23.5500, -46.6330, 10.0)));
    assert!(c.offer(Fix::new(-23.5510, -46.6336, 20.0)));
    assert!(!c.offer(Fix::new(-22.0, -45.0, 150.0)));
    assert!(!c.offer(Fix::new(f64::NAN, -45.0, 5.0)));

    let r = c.finish().unwrap();
    assert_eq!(c.state(), CaptureState::Done);
    assert_eq!(r.fix_count, 2);
    assert_relative_eq!(r.position.lat, -23.5505, epsilon = 1e-9);
    assert_relative_eq!(r.position.lon, -46.6333, epsilon = 1e-9);
    assert_relative_eq!(r.accuracy_m, 15.0);
    assert_eq!(r.zone_number, 23);
    assert_eq!(r.zone_letter, 'K');

    let p = r.projected.unwrap();
    assert_relative_eq!(p.easting, 333_287.9, epsilon = 5.0);
    assert_relative_eq!(p.northing, 7_394_588.3, epsilon = 5.0);
  }

  #[test]
  fn no_fixes_is_no_signal() {
    let (mut c, _) = collector();
    c.offer(Fix::new(-23.5, -46.6, 500.0));
    assert_eq!(c.finish(), Err(CaptureError::NoSignal));
    assert_eq!(c.state(), CaptureState::Failed);
  }

  #[test]
  fn fixes_after_close_are_ignored() {
    let (mut c, _) = collector();
    c.offer(Fix::new(10.0, 20.0, 5.0));
    c.close();
    c.close();
    assert!(!c.offer(Fix::new(50.0, 60.0, 5.0)));

    let r = c.finish().unwrap();
    assert_eq!(r.fix_count, 1);
    assert_relative_eq!(r.position.lat, 10.0);
    assert_eq!(r.zone_letter, 'P');
  }

  #[test]
  fn remaining_never_negative() {
    let (c, start) = collector();
    assert_eq!(c.remaining(start), DEFAULT_WINDOW);
    assert_eq!(c.remaining(start + Duration::from_secs(4)), Duration::from_secs(6));
    assert_eq!(c.remaining(start + Duration::from_secs(60)), Duration::ZERO);
  }

  #[test]
  fn idle_collector_ignores_fixes() {
    let mut c = FixCollector::new(CaptureConfig::default());
    assert_eq!(c.state(), CaptureState::Idle);
    assert!(!c.offer(Fix::new(0.0, 0.0, 1.0)));
    assert_eq!(c.remaining(Instant::now()), DEFAULT_WINDOW);
  }
}
