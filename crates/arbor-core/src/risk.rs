//! Risk scoring: a fixed weighted rule over sixteen structural and
//! environmental conditions.
//!
//! The score is always derived from the factor vector and never stored as an
//! authority of its own: every path that loads or mutates factors calls
//! [`RiskWeights::assess`] again.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of defined risk factors.
pub const FACTOR_COUNT: usize = 16;

/// Scores at or above this value classify as [`RiskLevel::Medium`].
pub const MEDIUM_THRESHOLD: u32 = 10;
/// Scores at or above this value classify as [`RiskLevel::High`].
pub const HIGH_THRESHOLD: u32 = 20;

// ─── Factor table ────────────────────────────────────────────────────────────

/// One row of the factor table: a stable key, a human label, and the default
/// weight.
#[derive(Debug, Clone, Copy)]
pub struct FactorDef {
  pub key:    &'static str,
  pub label:  &'static str,
  pub weight: u32,
}

/// The factor table, in vector order. Position `i` of every
/// [`RiskFactors`] refers to `FACTORS[i]`.
pub const FACTORS: [FactorDef; FACTOR_COUNT] = [
  FactorDef { key: "trunk_cracks",       label: "Cracks or splits in the trunk",      weight: 5 },
  FactorDef { key: "fungal_bodies",      label: "Fungal fruiting bodies",             weight: 3 },
  FactorDef { key: "trunk_decay",        label: "Trunk cavity or decay",              weight: 5 },
  FactorDef { key: "excessive_lean",     label: "Lean beyond 15 degrees",             weight: 2 },
  FactorDef { key: "root_damage",        label: "Damaged or severed roots",           weight: 5 },
  FactorDef { key: "dead_branches",      label: "Dead or hanging branches",           weight: 3 },
  FactorDef { key: "codominant_stems",   label: "Codominant stems",                   weight: 3 },
  FactorDef { key: "included_bark",      label: "Included bark at unions",            weight: 2 },
  FactorDef { key: "root_plate_lifting", label: "Root plate lifting",                 weight: 10 },
  FactorDef { key: "high_value_target",  label: "Frequently occupied target area",    weight: 4 },
  FactorDef { key: "utility_conflict",   label: "Conflict with power lines",          weight: 4 },
  FactorDef { key: "previous_failures",  label: "History of limb failure",            weight: 3 },
  FactorDef { key: "poor_pruning",       label: "Topping or poor pruning",            weight: 2 },
  FactorDef { key: "soil_compaction",    label: "Soil compaction or sealing",         weight: 1 },
  FactorDef { key: "pest_infestation",   label: "Pest infestation (termites, borers)", weight: 2 },
  FactorDef { key: "canopy_dieback",     label: "Canopy dieback",                     weight: 3 },
];

// ─── Factor vector ───────────────────────────────────────────────────────────

/// A fixed-order vector of risk-factor flags.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(from = "Vec<bool>", into = "Vec<bool>")]
pub struct RiskFactors([bool; FACTOR_COUNT]);

impl RiskFactors {
  pub fn none() -> Self { Self::default() }

  /// Build from a slice of any length. Missing trailing positions are false;
  /// positions past [`FACTOR_COUNT`] are ignored.
  pub fn from_slice(flags: &[bool]) -> Self {
    let mut out = [false; FACTOR_COUNT];
    for (slot, flag) in out.iter_mut().zip(flags) {
      *slot = *flag;
    }
    Self(out)
  }

  /// Build from factor indices that are present. Out-of-range indices are
  /// ignored.
  pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
    let mut out = [false; FACTOR_COUNT];
    for i in indices {
      if let Some(slot) = out.get_mut(i) {
        *slot = true;
      }
    }
    Self(out)
  }

  /// Parse the comma-separated flag list used in the export table.
  ///
  /// Never fails: unrecognised tokens and missing positions read as false.
  pub fn parse_flags(s: &str) -> Self {
    let flags: Vec<bool> = s.split(',').map(parse_flag).collect();
    Self::from_slice(&flags)
  }

  /// Render as the comma-separated `1`/`0` list used in the export table.
  pub fn to_flags(&self) -> String {
    self
      .0
      .iter()
      .map(|f| if *f { "1" } else { "0" })
      .collect::<Vec<_>>()
      .join(",")
  }

  pub fn get(&self, index: usize) -> bool {
    self.0.get(index).copied().unwrap_or(false)
  }

  pub fn set(&mut self, index: usize, present: bool) {
    if let Some(slot) = self.0.get_mut(index) {
      *slot = present;
    }
  }

  pub fn as_array(&self) -> &[bool; FACTOR_COUNT] { &self.0 }

  /// Indices of the factors that are present.
  pub fn present(&self) -> impl Iterator<Item = usize> + '_ {
    self.0.iter().enumerate().filter(|(_, f)| **f).map(|(i, _)| i)
  }
}

impl From<Vec<bool>> for RiskFactors {
  fn from(v: Vec<bool>) -> Self { Self::from_slice(&v) }
}

impl From<RiskFactors> for Vec<bool> {
  fn from(f: RiskFactors) -> Self { f.0.to_vec() }
}

fn parse_flag(token: &str) -> bool {
  matches!(
    token.trim().to_lowercase().as_str(),
    "1" | "true" | "yes" | "sim" | "x"
  )
}

// ─── Classification ──────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
  Low,
  Medium,
  High,
}

impl RiskLevel {
  pub fn from_score(score: u32) -> Self {
    if score >= HIGH_THRESHOLD {
      Self::High
    } else if score >= MEDIUM_THRESHOLD {
      Self::Medium
    } else {
      Self::Low
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Low => "Low",
      Self::Medium => "Medium",
      Self::High => "High",
    }
  }
}

impl fmt::Display for RiskLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The derived pair stored alongside a record's factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
  pub score: u32,
  pub level: RiskLevel,
}

// ─── Weights ─────────────────────────────────────────────────────────────────

/// Per-factor weights. Defaults to the weights in [`FACTORS`]; a deployment
/// may override them through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct RiskWeights([u32; FACTOR_COUNT]);

impl Default for RiskWeights {
  fn default() -> Self {
    let mut w = [0; FACTOR_COUNT];
    for (slot, def) in w.iter_mut().zip(FACTORS.iter()) {
      *slot = def.weight;
    }
    Self(w)
  }
}

impl RiskWeights {
  pub fn new(weights: [u32; FACTOR_COUNT]) -> Self { Self(weights) }

  pub fn weight(&self, index: usize) -> u32 {
    self.0.get(index).copied().unwrap_or(0)
  }

  /// Score and classify a factor vector. Pure and total; the sum saturates
  /// at `u32::MAX`.
  pub fn assess(&self, factors: &RiskFactors) -> Assessment {
    let score = factors
      .present()
      .fold(0u32, |acc, i| acc.saturating_add(self.weight(i)));
    Assessment { score, level: RiskLevel::from_score(score) }
  }
}

impl TryFrom<Vec<u32>> for RiskWeights {
  type Error = String;

  fn try_from(v: Vec<u32>) -> Result<Self, Self::Error> {
    let arr: [u32; FACTOR_COUNT] = v.try_into().map_err(|v: Vec<u32>| {
      format!("expected {FACTOR_COUNT} risk weights, got {}", v.len())
    })?;
    Ok(Self(arr))
  }
}

impl From<RiskWeights> for Vec<u32> {
  fn from(w: RiskWeights) -> Self { w.0.to_vec() }
}

/// Score `factors` with the built-in weight table.
pub fn compute(factors: &RiskFactors) -> Assessment {
  RiskWeights::default().assess(factors)
}
