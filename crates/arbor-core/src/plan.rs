//! Intervention plans: a scheduled job (pruning, removal, …) against one
//! tree.
//!
//! A plan references its tree but does not own it. Plans are written once and
//! never edited; planning the same tree again yields a new plan id.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, tree::TreeId};

// ─── Identity ────────────────────────────────────────────────────────────────

/// A plan identifier of the form `PI-<year>-<seq>`, with `seq` zero-padded to
/// three digits. The sequence restarts every calendar year.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
  pub fn new(year: i32, seq: u32) -> Self { Self(format!("PI-{year}-{seq:03}")) }

  /// Wrap an identifier read back from storage.
  pub fn from_stored(s: impl Into<String>) -> Self { Self(s.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// Split into `(year, seq)`; `None` if the string is not in plan-id form.
  pub fn parts(&self) -> Option<(i32, u32)> {
    let rest = self.0.strip_prefix("PI-")?;
    let (year, seq) = rest.split_once('-')?;
    Some((year.parse().ok()?, seq.parse().ok()?))
  }
}

impl fmt::Display for PlanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Sub-types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
  Pruning,
  CrownReduction,
  Removal,
  StumpGrinding,
  Bracing,
  RootTreatment,
  Other(String),
}

impl InterventionKind {
  pub fn parse(s: &str) -> Self {
    match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
      "pruning" | "prune" => Self::Pruning,
      "crown_reduction" => Self::CrownReduction,
      "removal" | "remove" | "felling" => Self::Removal,
      "stump_grinding" => Self::StumpGrinding,
      "bracing" | "cabling" => Self::Bracing,
      "root_treatment" => Self::RootTreatment,
      _ => Self::Other(s.trim().to_string()),
    }
  }
}

impl fmt::Display for InterventionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Pruning => f.write_str("Pruning"),
      Self::CrownReduction => f.write_str("Crown reduction"),
      Self::Removal => f.write_str("Removal"),
      Self::StumpGrinding => f.write_str("Stump grinding"),
      Self::Bracing => f.write_str("Bracing"),
      Self::RootTreatment => f.write_str("Root treatment"),
      Self::Other(s) => f.write_str(s),
    }
  }
}

/// Head-count of the crew assigned to a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamComposition {
  pub arborists:  u32,
  pub assistants: u32,
  pub operators:  u32,
}

impl TeamComposition {
  pub fn total(&self) -> u32 { self.arborists + self.assistants + self.operators }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// Input to [`crate::inventory::Inventory::create_plan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
  pub intervention:      InterventionKind,
  #[serde(default)]
  pub techniques:        Vec<String>,
  #[serde(default)]
  pub tools:             Vec<String>,
  #[serde(default)]
  pub ppe:               Vec<String>,
  #[serde(default)]
  pub team:              TeamComposition,
  pub schedule:          Schedule,
  #[serde(default)]
  pub waste_destination: String,
  #[serde(default)]
  pub responsible:       String,
  #[serde(default)]
  pub notes:             String,
}

impl PlanInput {
  pub(crate) fn validate(&self) -> Result<()> {
    if self.schedule.end < self.schedule.start {
      return Err(Error::Validation(format!(
        "schedule ends ({}) before it starts ({})",
        self.schedule.end, self.schedule.start
      )));
    }
    Ok(())
  }
}

/// A persisted intervention plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
  pub id:                PlanId,
  pub tree_id:           TreeId,
  pub created_at:        DateTime<Utc>,
  pub intervention:      InterventionKind,
  pub techniques:        Vec<String>,
  pub tools:             Vec<String>,
  pub ppe:               Vec<String>,
  pub team:              TeamComposition,
  pub schedule:          Schedule,
  pub waste_destination: String,
  pub responsible:       String,
  pub notes:             String,
}

impl PlanRecord {
  pub fn from_input(
    id: PlanId,
    tree_id: TreeId,
    created_at: DateTime<Utc>,
    input: PlanInput,
  ) -> Self {
    Self {
      id,
      tree_id,
      created_at,
      intervention: input.intervention,
      techniques: input.techniques,
      tools: input.tools,
      ppe: input.ppe,
      team: input.team,
      schedule: input.schedule,
      waste_destination: input.waste_destination,
      responsible: input.responsible,
      notes: input.notes,
    }
  }
}
