//! Tree record commands: add, edit, show, list, delete, clear, factors.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use arbor_core::{
  risk::{FACTOR_COUNT, FACTORS, RiskLevel, RiskWeights},
  tree::{Photo, PhotoChange, TreeId, TreeInput, TreeRecord, content_type_for},
};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};

use crate::{Store, config::ArborConfig};

/// Field flags shared by `add` and `edit`.
#[derive(Args)]
pub struct TreeFields {
  /// Survey date (YYYY-MM-DD); defaults to today.
  #[arg(long)]
  date:        Option<NaiveDate>,
  #[arg(long)]
  species:     Option<String>,
  #[arg(long)]
  location:    Option<String>,
  /// Easting in metres.
  #[arg(long)]
  x:           Option<f64>,
  /// Northing in metres.
  #[arg(long)]
  y:           Option<f64>,
  #[arg(long)]
  zone:        Option<u8>,
  #[arg(long)]
  zone_letter: Option<char>,
  /// Trunk diameter at breast height, in centimetres.
  #[arg(long)]
  diameter:    Option<f64>,
  /// Height in metres.
  #[arg(long)]
  height:      Option<f64>,
  /// Observer distance used for the height estimate, in metres.
  #[arg(long)]
  distance:    Option<f64>,
  #[arg(long)]
  observer:    Option<String>,
  #[arg(long)]
  notes:       Option<String>,
  /// Mark a risk factor present, by key or index. Repeatable.
  #[arg(long = "factor", value_name = "KEY")]
  factors:     Vec<String>,
  /// Mark a risk factor absent, by key or index. Repeatable.
  #[arg(long = "no-factor", value_name = "KEY")]
  no_factors:  Vec<String>,
  /// Attach a photo file.
  #[arg(long, value_name = "FILE")]
  photo:       Option<PathBuf>,
}

impl TreeFields {
  /// Overlay the flags that were given onto `input`.
  fn apply(&self, input: &mut TreeInput) -> anyhow::Result<()> {
    if let Some(d) = self.date {
      input.date = Some(d);
    }
    if let Some(s) = &self.species {
      input.species = s.clone();
    }
    if let Some(s) = &self.location {
      input.location = s.clone();
    }
    if let Some(s) = &self.observer {
      input.observer = s.clone();
    }
    if let Some(s) = &self.notes {
      input.notes = s.clone();
    }
    input.coord_x = self.x.or(input.coord_x);
    input.coord_y = self.y.or(input.coord_y);
    input.zone_number = self.zone.or(input.zone_number);
    input.zone_letter = self.zone_letter.or(input.zone_letter);
    input.diameter_cm = self.diameter.or(input.diameter_cm);
    input.height_m = self.height.or(input.height_m);
    input.distance_m = self.distance.or(input.distance_m);

    for key in &self.factors {
      input.risk_factors.set(factor_index(key)?, true);
    }
    for key in &self.no_factors {
      input.risk_factors.set(factor_index(key)?, false);
    }
    Ok(())
  }
}

fn factor_index(key: &str) -> anyhow::Result<usize> {
  if let Ok(i) = key.parse::<usize>() {
    if i < FACTOR_COUNT {
      return Ok(i);
    }
    bail!("factor index {i} is out of range (0..{FACTOR_COUNT})");
  }
  FACTORS
    .iter()
    .position(|f| f.key.eq_ignore_ascii_case(key))
    .with_context(|| format!("unknown risk factor {key:?}; see `arbor factors`"))
}

fn read_photo(path: &Path) -> anyhow::Result<Photo> {
  let data =
    std::fs::read(path).with_context(|| format!("failed to read photo {}", path.display()))?;
  let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
  Ok(Photo::new(content_type_for(ext), data))
}

// ─── Commands ────────────────────────────────────────────────────────────────

pub async fn add(inv: &mut Store, cfg: &ArborConfig, fields: TreeFields) -> anyhow::Result<()> {
  let mut input = TreeInput {
    zone_number: Some(cfg.zone_number),
    zone_letter: Some(cfg.zone_letter),
    ..TreeInput::default()
  };
  fields.apply(&mut input)?;
  let photo = fields.photo.as_deref().map(read_photo).transpose()?;

  let rec = inv.add(input, photo).await?;
  println!("added tree {}: {} ({} {})", rec.id, rec.species, rec.score, rec.risk_level);
  Ok(())
}

pub async fn edit(
  inv: &mut Store,
  id: TreeId,
  fields: TreeFields,
  remove_photo: bool,
) -> anyhow::Result<()> {
  let existing = inv.get(id).with_context(|| format!("tree {id} not found"))?;
  let mut input = existing.to_input();
  fields.apply(&mut input)?;

  let change = match (&fields.photo, remove_photo) {
    (Some(path), _) => PhotoChange::Replace(read_photo(path)?),
    (None, true) => PhotoChange::Remove,
    (None, false) => PhotoChange::Keep,
  };

  let rec = inv.edit(id, input, change).await?;
  println!("updated tree {}: {} ({} {})", rec.id, rec.species, rec.score, rec.risk_level);
  Ok(())
}

pub fn show(inv: &Store, id: TreeId, json: bool) -> anyhow::Result<()> {
  let t = inv.get(id).with_context(|| format!("tree {id} not found"))?;
  if json {
    println!("{}", serde_json::to_string_pretty(t)?);
    return Ok(());
  }

  println!("Tree {}: {}", t.id, t.species);
  println!("  date       {}", t.date);
  println!("  location   {}", t.location);
  match (t.coord_x, t.coord_y) {
    (Some(x), Some(y)) => {
      println!("  utm        {x} E {y} N  zone {}{}", t.zone_number, t.zone_letter)
    }
    _ => println!("  utm        N/A"),
  }
  if let Some(g) = t.geographic() {
    println!("  lat/lon    {:.6}, {:.6}", g.lat, g.lon);
  }
  println!("  diameter   {}", fmt_opt(t.diameter_cm, "cm"));
  println!("  height     {}", fmt_opt(t.height_m, "m"));
  println!("  distance   {}", fmt_opt(t.distance_m, "m"));
  println!("  observer   {}", t.observer);
  println!("  photo      {}", if t.has_photo { "yes" } else { "no" });
  println!("  risk       {} ({})", t.risk_level, t.score);
  for i in t.risk_factors.present() {
    println!("    - {}", FACTORS[i].label);
  }
  if !t.notes.is_empty() {
    println!("  notes      {}", t.notes);
  }
  for p in inv.plans_for(id) {
    println!(
      "  plan       {} {} {}..{}",
      p.id, p.intervention, p.schedule.start, p.schedule.end
    );
  }
  Ok(())
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LevelArg {
  Low,
  Medium,
  High,
}

impl From<LevelArg> for RiskLevel {
  fn from(l: LevelArg) -> Self {
    match l {
      LevelArg::Low => Self::Low,
      LevelArg::Medium => Self::Medium,
      LevelArg::High => Self::High,
    }
  }
}

pub fn list(inv: &Store, level: Option<LevelArg>) {
  let level = level.map(RiskLevel::from);
  let rows: Vec<&TreeRecord> =
    inv.trees().filter(|t| level.is_none_or(|l| t.risk_level == l)).collect();

  println!(
    "{:>5}  {:<10}  {:<28}  {:>5}  {:<6}  PHOTO",
    "ID", "DATE", "SPECIES", "SCORE", "RISK"
  );
  for t in &rows {
    println!(
      "{:>5}  {:<10}  {:<28}  {:>5}  {:<6}  {}",
      t.id,
      t.date.to_string(),
      truncate(&t.species, 28),
      t.score,
      t.risk_level.as_str(),
      if t.has_photo { "yes" } else { "" }
    );
  }

  let s = inv.summary();
  println!(
    "{} trees: {} high, {} medium, {} low; {} with photo",
    s.total, s.high, s.medium, s.low, s.with_photo
  );
}

pub async fn delete(inv: &mut Store, id: TreeId) -> anyhow::Result<()> {
  let rec = inv.delete(id).await?;
  println!("deleted tree {}: {}", rec.id, rec.species);
  Ok(())
}

pub async fn clear(inv: &mut Store, yes: bool) -> anyhow::Result<()> {
  if !yes {
    bail!("refusing to delete {} trees without --yes", inv.len());
  }
  let n = inv.clear_all().await?;
  println!("deleted {n} trees");
  Ok(())
}

pub fn factors(weights: &RiskWeights) {
  println!("{:>2}  {:<20}  {:>6}  {}", "#", "KEY", "WEIGHT", "DESCRIPTION");
  for (i, f) in FACTORS.iter().enumerate() {
    println!("{i:>2}  {:<20}  {:>6}  {}", f.key, weights.weight(i), f.label);
  }
}

fn fmt_opt(v: Option<f64>, unit: &str) -> String {
  v.map_or_else(|| "N/A".to_owned(), |v| format!("{v} {unit}"))
}

fn truncate(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_owned()
  } else {
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('…');
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn factor_lookup_by_key_or_index() {
    assert_eq!(factor_index("trunk_cracks").unwrap(), 0);
    assert_eq!(factor_index("ROOT_PLATE_LIFTING").unwrap(), 8);
    assert_eq!(factor_index("15").unwrap(), 15);
    assert!(factor_index("16").is_err());
    assert!(factor_index("bark_color").is_err());
  }

  #[test]
  fn truncate_long_names() {
    assert_eq!(truncate("Ipê", 5), "Ipê");
    assert_eq!(truncate("Handroanthus impetiginosus", 10), "Handroant…");
  }
}
