//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD`, timestamps as RFC 3339 strings.
//! Structured fields (factor vectors, plan lists, team) are compact JSON.

use arbor_core::{
  plan::{PlanId, PlanRecord, Schedule},
  risk::{RiskFactors, RiskLevel},
  tree::{TreeId, TreeRecord},
};
use chrono::{DateTime, NaiveDate, Utc};

use crate::{Error, Result};

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── RiskLevel ───────────────────────────────────────────────────────────────

pub fn encode_risk_level(l: RiskLevel) -> &'static str {
  match l {
    RiskLevel::Low => "low",
    RiskLevel::Medium => "medium",
    RiskLevel::High => "high",
  }
}

pub fn decode_risk_level(s: &str) -> Result<RiskLevel> {
  match s {
    "low" => Ok(RiskLevel::Low),
    "medium" => Ok(RiskLevel::Medium),
    "high" => Ok(RiskLevel::High),
    other => Err(Error::Decode { column: "risk_level", value: other.to_string() }),
  }
}

// ─── Zone letter ─────────────────────────────────────────────────────────────

pub fn decode_zone_letter(s: &str) -> Result<char> {
  let mut chars = s.chars();
  match (chars.next(), chars.next()) {
    (Some(c), None) if c.is_ascii_alphabetic() => Ok(c),
    _ => Err(Error::Decode { column: "zone_letter", value: s.to_string() }),
  }
}

// ─── Trees ───────────────────────────────────────────────────────────────────

/// Column values for one `trees` row, ready to bind.
pub struct TreeRow {
  pub tree_id:      i64,
  pub date:         String,
  pub species:      String,
  pub location:     String,
  pub coord_x:      Option<f64>,
  pub coord_y:      Option<f64>,
  pub zone_number:  i64,
  pub zone_letter:  String,
  pub diameter_cm:  Option<f64>,
  pub height_m:     Option<f64>,
  pub distance_m:   Option<f64>,
  pub observer:     String,
  pub notes:        String,
  pub risk_factors: String,
  pub score:        i64,
  pub risk_level:   String,
  pub has_photo:    bool,
}

impl TreeRow {
  pub fn encode(t: &TreeRecord) -> Result<Self> {
    Ok(Self {
      tree_id:      i64::from(t.id),
      date:         encode_date(t.date),
      species:      t.species.clone(),
      location:     t.location.clone(),
      coord_x:      t.coord_x,
      coord_y:      t.coord_y,
      zone_number:  i64::from(t.zone_number),
      zone_letter:  t.zone_letter.to_string(),
      diameter_cm:  t.diameter_cm,
      height_m:     t.height_m,
      distance_m:   t.distance_m,
      observer:     t.observer.clone(),
      notes:        t.notes.clone(),
      risk_factors: serde_json::to_string(&t.risk_factors)?,
      score:        i64::from(t.score),
      risk_level:   encode_risk_level(t.risk_level).to_owned(),
      has_photo:    t.has_photo,
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      tree_id:      row.get(0)?,
      date:         row.get(1)?,
      species:      row.get(2)?,
      location:     row.get(3)?,
      coord_x:      row.get(4)?,
      coord_y:      row.get(5)?,
      zone_number:  row.get(6)?,
      zone_letter:  row.get(7)?,
      diameter_cm:  row.get(8)?,
      height_m:     row.get(9)?,
      distance_m:   row.get(10)?,
      observer:     row.get(11)?,
      notes:        row.get(12)?,
      risk_factors: row.get(13)?,
      score:        row.get(14)?,
      risk_level:   row.get(15)?,
      has_photo:    row.get(16)?,
    })
  }

  pub fn into_record(self) -> Result<TreeRecord> {
    let risk_factors: RiskFactors = serde_json::from_str(&self.risk_factors)?;
    Ok(TreeRecord {
      id:           decode_id(self.tree_id)?,
      date:         decode_date(&self.date)?,
      species:      self.species,
      location:     self.location,
      coord_x:      self.coord_x,
      coord_y:      self.coord_y,
      zone_number:  u8::try_from(self.zone_number).map_err(|_| Error::Decode {
        column: "zone_number",
        value:  self.zone_number.to_string(),
      })?,
      zone_letter:  decode_zone_letter(&self.zone_letter)?,
      diameter_cm:  self.diameter_cm,
      height_m:     self.height_m,
      distance_m:   self.distance_m,
      observer:     self.observer,
      notes:        self.notes,
      risk_factors,
      score:        u32::try_from(self.score).unwrap_or(0),
      risk_level:   decode_risk_level(&self.risk_level)?,
      has_photo:    self.has_photo,
    })
  }
}

pub fn decode_id(raw: i64) -> Result<TreeId> {
  TreeId::try_from(raw)
    .map_err(|_| Error::Decode { column: "tree_id", value: raw.to_string() })
}

// ─── Plans ───────────────────────────────────────────────────────────────────

/// Column values for one `plans` row.
pub struct PlanRow {
  pub plan_id:           String,
  pub tree_id:           i64,
  pub created_at:        String,
  pub intervention:      String,
  pub techniques:        String,
  pub tools:             String,
  pub ppe:               String,
  pub team:              String,
  pub schedule_start:    String,
  pub schedule_end:      String,
  pub waste_destination: String,
  pub responsible:       String,
  pub notes:             String,
}

impl PlanRow {
  pub fn encode(p: &PlanRecord) -> Result<Self> {
    Ok(Self {
      plan_id:           p.id.as_str().to_owned(),
      tree_id:           i64::from(p.tree_id),
      created_at:        encode_dt(p.created_at),
      intervention:      serde_json::to_string(&p.intervention)?,
      techniques:        serde_json::to_string(&p.techniques)?,
      tools:             serde_json::to_string(&p.tools)?,
      ppe:               serde_json::to_string(&p.ppe)?,
      team:              serde_json::to_string(&p.team)?,
      schedule_start:    encode_date(p.schedule.start),
      schedule_end:      encode_date(p.schedule.end),
      waste_destination: p.waste_destination.clone(),
      responsible:       p.responsible.clone(),
      notes:             p.notes.clone(),
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      plan_id:           row.get(0)?,
      tree_id:           row.get(1)?,
      created_at:        row.get(2)?,
      intervention:      row.get(3)?,
      techniques:        row.get(4)?,
      tools:             row.get(5)?,
      ppe:               row.get(6)?,
      team:              row.get(7)?,
      schedule_start:    row.get(8)?,
      schedule_end:      row.get(9)?,
      waste_destination: row.get(10)?,
      responsible:       row.get(11)?,
      notes:             row.get(12)?,
    })
  }

  pub fn into_record(self) -> Result<PlanRecord> {
    Ok(PlanRecord {
      id:                PlanId::from_stored(self.plan_id),
      tree_id:           decode_id(self.tree_id)?,
      created_at:        decode_dt(&self.created_at)?,
      intervention:      serde_json::from_str(&self.intervention)?,
      techniques:        serde_json::from_str(&self.techniques)?,
      tools:             serde_json::from_str(&self.tools)?,
      ppe:               serde_json::from_str(&self.ppe)?,
      team:              serde_json::from_str(&self.team)?,
      schedule:          Schedule {
        start: decode_date(&self.schedule_start)?,
        end:   decode_date(&self.schedule_end)?,
      },
      waste_destination: self.waste_destination,
      responsible:       self.responsible,
      notes:             self.notes,
    })
  }
}
