//! Tree records: one surveyed tree with its measurements, location, and
//! derived risk assessment.

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  coords::{self, DEFAULT_ZONE_LETTER, DEFAULT_ZONE_NUMBER, GeoPoint, Hemisphere},
  risk::{Assessment, RiskFactors, RiskLevel, RiskWeights},
};

/// Identity of a tree. Positive, unique, and assigned as
/// `max(existing) + 1`.
pub type TreeId = u32;

// ─── Photo ───────────────────────────────────────────────────────────────────

/// A binary photo payload and its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
  pub content_type: String,
  pub data:         Bytes,
}

impl Photo {
  pub fn new(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
    Self { content_type: content_type.into(), data: data.into() }
  }

  /// File extension matching the content type, used for archive entries.
  pub fn extension(&self) -> &'static str {
    extension_for(&self.content_type)
  }
}

/// Image types with a dedicated archive extension. Each content type maps to
/// exactly one extension and back, so listed types survive an export.
const IMAGE_TYPES: [(&str, &str); 9] = [
  ("image/jpeg", "jpg"),
  ("image/png", "png"),
  ("image/webp", "webp"),
  ("image/gif", "gif"),
  ("image/heic", "heic"),
  ("image/heif", "heif"),
  ("image/avif", "avif"),
  ("image/tiff", "tiff"),
  ("image/bmp", "bmp"),
];

/// Map a content type onto a file extension.
///
/// `image/jpg` and `image/pjpeg` normalise to `image/jpeg`. Types outside the
/// table become `bin` and read back as `application/octet-stream`.
pub fn extension_for(content_type: &str) -> &'static str {
  let ct = content_type.to_ascii_lowercase();
  let ct = match ct.as_str() {
    "image/jpg" | "image/pjpeg" => "image/jpeg",
    other => other,
  };
  IMAGE_TYPES.iter().find(|(t, _)| *t == ct).map_or("bin", |(_, ext)| *ext)
}

/// Inverse of [`extension_for`]; also accepts `jpeg` and `tif`.
pub fn content_type_for(extension: &str) -> &'static str {
  let ext = extension.to_ascii_lowercase();
  let ext = match ext.as_str() {
    "jpeg" => "jpg",
    "tif" => "tiff",
    other => other,
  };
  IMAGE_TYPES
    .iter()
    .find(|(_, e)| *e == ext)
    .map_or("application/octet-stream", |(t, _)| *t)
}

/// What an edit does to the stored photo.
#[derive(Debug, Clone, Default)]
pub enum PhotoChange {
  /// Leave whatever is stored untouched.
  #[default]
  Keep,
  Replace(Photo),
  Remove,
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// Validated input for [`crate::inventory::Inventory::add`] and
/// [`crate::inventory::Inventory::edit`]. Carries no id, score, or photo
/// flag: those are owned by the inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeInput {
  pub date:         Option<NaiveDate>,
  pub species:      String,
  #[serde(default)]
  pub location:     String,
  pub coord_x:      Option<f64>,
  pub coord_y:      Option<f64>,
  pub zone_number:  Option<u8>,
  pub zone_letter:  Option<char>,
  pub diameter_cm:  Option<f64>,
  pub height_m:     Option<f64>,
  /// Horizontal distance from the observer used for height estimation.
  pub distance_m:   Option<f64>,
  #[serde(default)]
  pub observer:     String,
  #[serde(default)]
  pub notes:        String,
  #[serde(default)]
  pub risk_factors: RiskFactors,
}

impl TreeInput {
  pub fn new(species: impl Into<String>) -> Self {
    Self { species: species.into(), ..Self::default() }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A stored tree. `score` and `risk_level` always equal
/// `weights.assess(&risk_factors)`; `has_photo` always mirrors the photo
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
  pub id:           TreeId,
  pub date:         NaiveDate,
  pub species:      String,
  pub location:     String,
  pub coord_x:      Option<f64>,
  pub coord_y:      Option<f64>,
  pub zone_number:  u8,
  pub zone_letter:  char,
  pub diameter_cm:  Option<f64>,
  pub height_m:     Option<f64>,
  pub distance_m:   Option<f64>,
  pub observer:     String,
  pub notes:        String,
  pub risk_factors: RiskFactors,
  pub score:        u32,
  pub risk_level:   RiskLevel,
  pub has_photo:    bool,
}

impl TreeRecord {
  /// Build a record from input, applying zone defaults and deriving the
  /// assessment. `today` fills in a missing date.
  pub fn from_input(
    id: TreeId,
    input: TreeInput,
    weights: &RiskWeights,
    today: NaiveDate,
  ) -> Self {
    let Assessment { score, level } = weights.assess(&input.risk_factors);
    Self {
      id,
      date: input.date.unwrap_or(today),
      species: input.species.trim().to_string(),
      location: input.location,
      coord_x: input.coord_x.filter(|v| v.is_finite()),
      coord_y: input.coord_y.filter(|v| v.is_finite()),
      zone_number: input
        .zone_number
        .filter(|z| (1..=60).contains(z))
        .unwrap_or(DEFAULT_ZONE_NUMBER),
      zone_letter: input
        .zone_letter
        .map(|c| c.to_ascii_uppercase())
        .filter(char::is_ascii_alphabetic)
        .unwrap_or(DEFAULT_ZONE_LETTER),
      diameter_cm: input.diameter_cm,
      height_m: input.height_m,
      distance_m: input.distance_m,
      observer: input.observer,
      notes: input.notes,
      risk_factors: input.risk_factors,
      score,
      risk_level: level,
      has_photo: false,
    }
  }

  /// Re-derive `score` and `risk_level` from the factors. Returns `true` if
  /// the stored values were stale.
  pub fn rescore(&mut self, weights: &RiskWeights) -> bool {
    let a = weights.assess(&self.risk_factors);
    let stale = a.score != self.score || a.level != self.risk_level;
    self.score = a.score;
    self.risk_level = a.level;
    stale
  }

  pub fn hemisphere(&self) -> Hemisphere {
    Hemisphere::from_zone_letter(self.zone_letter)
  }

  /// The record's position as latitude/longitude, if it has usable
  /// coordinates.
  pub fn geographic(&self) -> Option<GeoPoint> {
    coords::to_geographic(
      self.coord_x?,
      self.coord_y?,
      self.zone_number,
      self.hemisphere(),
    )
  }

  /// Project the record back into an input, e.g. to seed an edit form.
  pub fn to_input(&self) -> TreeInput {
    TreeInput {
      date:         Some(self.date),
      species:      self.species.clone(),
      location:     self.location.clone(),
      coord_x:      self.coord_x,
      coord_y:      self.coord_y,
      zone_number:  Some(self.zone_number),
      zone_letter:  Some(self.zone_letter),
      diameter_cm:  self.diameter_cm,
      height_m:     self.height_m,
      distance_m:   self.distance_m,
      observer:     self.observer.clone(),
      notes:        self.notes.clone(),
      risk_factors: self.risk_factors,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::risk::RiskLevel;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() }

  #[test]
  fn from_input_applies_defaults_and_scores() {
    let mut input = TreeInput::new("  Tipuana tipu ");
    input.risk_factors = RiskFactors::from_indices([8, 9, 10, 4]);
    input.zone_number = Some(99);

    let r = TreeRecord::from_input(7, input, &RiskWeights::default(), today());
    assert_eq!(r.id, 7);
    assert_eq!(r.species, "Tipuana tipu");
    assert_eq!(r.date, today());
    assert_eq!(r.zone_number, DEFAULT_ZONE_NUMBER);
    assert_eq!(r.zone_letter, DEFAULT_ZONE_LETTER);
    assert_eq!(r.score, 23);
    assert_eq!(r.risk_level, RiskLevel::High);
    assert!(!r.has_photo);
  }

  #[test]
  fn rescore_repairs_stale_cache() {
    let mut r =
      TreeRecord::from_input(1, TreeInput::new("Ficus"), &RiskWeights::default(), today());
    r.score = 99;
    r.risk_level = RiskLevel::High;
    assert!(r.rescore(&RiskWeights::default()));
    assert_eq!(r.score, 0);
    assert_eq!(r.risk_level, RiskLevel::Low);
    assert!(!r.rescore(&RiskWeights::default()));
  }

  #[test]
  fn geographic_requires_both_coordinates() {
    let mut input = TreeInput::new("Ipê");
    input.coord_x = Some(333_288.0);
    let r = TreeRecord::from_input(1, input.clone(), &RiskWeights::default(), today());
    assert!(r.geographic().is_none());

    input.coord_y = Some(7_394_588.0);
    let r = TreeRecord::from_input(1, input, &RiskWeights::default(), today());
    let g = r.geographic().unwrap();
    assert!((g.lat + 23.55).abs() < 0.01, "{g:?}");
    assert!((g.lon + 46.63).abs() < 0.01, "{g:?}");
  }

  #[test]
  fn extension_mapping() {
    assert_eq!(Photo::new("image/jpeg", vec![1u8]).extension(), "jpg");
    assert_eq!(extension_for("IMAGE/PNG"), "png");
    assert_eq!(extension_for("text/plain"), "bin");
    assert_eq!(content_type_for("jpeg"), "image/jpeg");
    assert_eq!(content_type_for("bin"), "application/octet-stream");
  }

  #[test]
  fn listed_content_types_survive_extension_roundtrip() {
    for (ct, _) in IMAGE_TYPES {
      assert_eq!(content_type_for(extension_for(ct)), ct);
    }
    assert_eq!(content_type_for(extension_for("image/heif")), "image/heif");
    assert_eq!(content_type_for(extension_for("image/tiff")), "image/tiff");
    assert_eq!(content_type_for(extension_for("image/pjpeg")), "image/jpeg");
  }
}
