//! The `;`-delimited inventory table.
//!
//! One header line, then one record per line. Free text never contains the
//! delimiter or a line break, so no quoting is needed. Parsing is lenient per
//! row: a row that cannot be read is skipped and reported, never fatal.

use arbor_core::{
  risk::RiskFactors,
  tree::{TreeId, TreeInput, TreeRecord},
};
use chrono::NaiveDate;
use tracing::warn;

pub const DELIMITER: char = ';';
pub(crate) const BOM: char = '\u{feff}';
const LINE_END: &str = "\r\n";
const ABSENT: &str = "N/A";
const YES: &str = "Yes";
const NO: &str = "No";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub const HEADER: [&str; 17] = [
  "ID",
  "Date",
  "Species",
  "CoordX",
  "CoordY",
  "ZoneNum",
  "ZoneLetter",
  "DAP",
  "Height",
  "Distance",
  "Location",
  "Observer",
  "Score",
  "RiskLevel",
  "Notes",
  "FactorsList",
  "HasPhoto",
];

/// Rows with fewer fields than this (everything up to `FactorsList`) are
/// skipped.
pub const MIN_FIELDS: usize = 16;

// ─── Serialize ───────────────────────────────────────────────────────────────

/// Render records as the table, BOM and header first.
pub fn serialize<'a>(trees: impl IntoIterator<Item = &'a TreeRecord>) -> String {
  let mut out = String::new();
  out.push(BOM);
  out.push_str(&HEADER.join(";"));
  out.push_str(LINE_END);

  for t in trees {
    let fields = [
      t.id.to_string(),
      t.date.format(DATE_FORMAT).to_string(),
      clean_text(&t.species),
      fmt_num(t.coord_x),
      fmt_num(t.coord_y),
      t.zone_number.to_string(),
      t.zone_letter.to_string(),
      fmt_num(t.diameter_cm),
      fmt_num(t.height_m),
      fmt_num(t.distance_m),
      clean_text(&t.location),
      clean_text(&t.observer),
      t.score.to_string(),
      t.risk_level.as_str().to_owned(),
      clean_text(&t.notes),
      t.risk_factors.to_flags(),
      if t.has_photo { YES } else { NO }.to_owned(),
    ];
    out.push_str(&fields.join(";"));
    out.push_str(LINE_END);
  }
  out
}

/// Strip the field delimiter and line breaks from free text.
fn clean_text(s: &str) -> String {
  s.replace(DELIMITER, ",").replace("\r\n", " ").replace(['\r', '\n'], " ")
}

fn fmt_num(v: Option<f64>) -> String {
  match v {
    Some(v) if v.is_finite() => v.to_string(),
    _ => ABSENT.to_owned(),
  }
}

// ─── Parse ───────────────────────────────────────────────────────────────────

/// One accepted row.
#[derive(Debug, Clone)]
pub struct TableRow {
  /// 1-based line number in the table.
  pub line:        usize,
  /// The id the row carried when exported; used to find its photo.
  pub original_id: Option<TreeId>,
  pub input:       TreeInput,
  pub has_photo:   bool,
}

/// A row that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
  pub line:   usize,
  pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
  pub rows:    Vec<TableRow>,
  pub skipped: Vec<SkippedRow>,
}

/// Parse a table. The first line is the header and is never read as data;
/// blank lines are ignored.
pub fn parse(input: &str) -> ParsedTable {
  let input = input.strip_prefix(BOM).unwrap_or(input);
  let mut table = ParsedTable::default();

  for (idx, raw) in input.split('\n').enumerate().skip(1) {
    let line = idx + 1;
    let text = raw.strip_suffix('\r').unwrap_or(raw);
    if text.trim().is_empty() {
      continue;
    }
    match parse_row(line, text) {
      Ok(row) => table.rows.push(row),
      Err(reason) => {
        warn!(line, %reason, "skipping table row");
        table.skipped.push(SkippedRow { line, reason });
      }
    }
  }
  table
}

fn parse_row(line: usize, text: &str) -> Result<TableRow, String> {
  // Free-text columns are kept as written; structured columns are trimmed.
  let raw: Vec<&str> = text.split(DELIMITER).collect();
  if raw.len() < MIN_FIELDS {
    return Err(format!("expected at least {MIN_FIELDS} fields, found {}", raw.len()));
  }
  let f = |i: usize| raw.get(i).map_or("", |s| s.trim());

  let species = raw[2];
  if species.trim().is_empty() {
    return Err("species is empty".into());
  }

  let date = if is_absent(f(1)) {
    None
  } else {
    Some(
      NaiveDate::parse_from_str(f(1), DATE_FORMAT)
        .map_err(|e| format!("invalid date {:?}: {e}", f(1)))?,
    )
  };

  let input = TreeInput {
    date,
    species: species.to_owned(),
    location: raw[10].to_owned(),
    coord_x: parse_num(f(3)),
    coord_y: parse_num(f(4)),
    zone_number: f(5).parse().ok(),
    zone_letter: f(6).chars().next().filter(char::is_ascii_alphabetic),
    diameter_cm: parse_num(f(7)),
    height_m: parse_num(f(8)),
    distance_m: parse_num(f(9)),
    observer: raw[11].to_owned(),
    // Score and RiskLevel (columns 12 and 13) are recomputed, never read.
    notes: raw[14].to_owned(),
    risk_factors: RiskFactors::parse_flags(f(15)),
  };

  Ok(TableRow {
    line,
    original_id: f(0).parse().ok(),
    input,
    has_photo: raw.len() > 16 && parse_bool(f(16)),
  })
}

fn is_absent(s: &str) -> bool { s.is_empty() || s.eq_ignore_ascii_case(ABSENT) }

/// Parse a number, accepting `,` as the decimal separator.
fn parse_num(s: &str) -> Option<f64> {
  if is_absent(s) {
    return None;
  }
  s.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_bool(s: &str) -> bool {
  matches!(s.to_lowercase().as_str(), "yes" | "sim" | "true" | "1")
}

#[cfg(test)]
mod tests {
  use arbor_core::risk::{RiskLevel, RiskWeights};

  use super::*;

  fn record() -> TreeRecord {
    let mut input = TreeInput::new("Tipuana tipu");
    input.date = NaiveDate::from_ymd_opt(2024, 3, 9);
    input.location = "Av. Paulista; canteiro central".into();
    input.coord_x = Some(333_288.5);
    input.coord_y = Some(7_394_588.0);
    input.diameter_cm = Some(61.0);
    input.notes = "fork at 3 m\r\nwatch crack".into();
    input.risk_factors = RiskFactors::from_indices([0, 8]);
    let mut rec = TreeRecord::from_input(4, input, &RiskWeights::default(), NaiveDate::MIN);
    rec.has_photo = true;
    rec
  }

  #[test]
  fn serialize_layout() {
    let out = serialize([&record()]);
    assert!(out.starts_with('\u{feff}'));

    let lines: Vec<&str> = out.trim_start_matches(BOM).split("\r\n").collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], HEADER.join(";"));
    assert_eq!(lines[2], "");

    let fields: Vec<&str> = lines[1].split(';').collect();
    assert_eq!(fields.len(), 17);
    assert_eq!(fields[0], "4");
    assert_eq!(fields[1], "2024-03-09");
    assert_eq!(fields[3], "333288.5");
    assert_eq!(fields[8], "N/A");
    assert_eq!(fields[10], "Av. Paulista, canteiro central");
    assert_eq!(fields[12], "15");
    assert_eq!(fields[13], "Medium");
    assert_eq!(fields[14], "fork at 3 m watch crack");
    assert_eq!(fields[15], "1,0,0,0,0,0,0,0,1,0,0,0,0,0,0,0");
    assert_eq!(fields[16], "Yes");
  }

  #[test]
  fn parse_reads_serialized_rows() {
    let table = parse(&serialize([&record()]));
    assert!(table.skipped.is_empty());
    assert_eq!(table.rows.len(), 1);

    let row = &table.rows[0];
    assert_eq!(row.line, 2);
    assert_eq!(row.original_id, Some(4));
    assert!(row.has_photo);
    assert_eq!(row.input.species, "Tipuana tipu");
    assert_eq!(row.input.coord_x, Some(333_288.5));
    assert_eq!(row.input.height_m, None);
    assert_eq!(row.input.zone_letter, Some('K'));
    assert_eq!(
      RiskWeights::default().assess(&row.input.risk_factors).level,
      RiskLevel::Medium
    );
  }

  #[test]
  fn parse_is_lenient_about_format() {
    let text = "header\n\
                7;;Ipê;333288,25;;23;K;;;;;;999;High;;sim,x,0\n\
                \n";
    let table = parse(text);
    assert!(table.skipped.is_empty());
    let row = &table.rows[0];
    assert_eq!(row.input.date, None);
    assert_eq!(row.input.coord_x, Some(333_288.25));
    assert_eq!(row.input.coord_y, None);
    assert!(row.input.risk_factors.get(0));
    assert!(row.input.risk_factors.get(1));
    assert!(!row.input.risk_factors.get(2));
    assert!(!row.has_photo, "missing HasPhoto column means no photo");
  }

  #[test]
  fn parse_skips_bad_rows_and_continues() {
    let text = "header\r\n\
                1;2024-01-01;Short row\r\n\
                2;2024-01-01;;;;23;K;;;;;;0;Low;;0;No\r\n\
                3;01/02/2024;Ficus;;;23;K;;;;;;0;Low;;0;No\r\n\
                4;2024-01-02;Ficus;;;23;K;;;;;;0;Low;;0;No\r\n";
    let table = parse(text);

    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].original_id, Some(4));
    let lines: Vec<_> = table.skipped.iter().map(|s| s.line).collect();
    assert_eq!(lines, vec![2, 3, 4]);
  }

  #[test]
  fn free_text_keeps_surrounding_whitespace() {
    let mut rec = record();
    rec.location = "  Rua A, 10 ".into();
    rec.observer = " J. Lima".into();
    rec.notes = "leaning north  ".into();

    let table = parse(&serialize([&rec]));
    let row = &table.rows[0];
    assert_eq!(row.input.location, "  Rua A, 10 ");
    assert_eq!(row.input.observer, " J. Lima");
    assert_eq!(row.input.notes, "leaning north  ");
  }

  #[test]
  fn structured_columns_are_trimmed() {
    let text = "header\n 5 ; 2024-01-02 ;Ficus; 1,5 ;;23; K ;;;;;;0;Low;; 1,0 ; Yes \n";
    let row = &parse(text).rows[0];
    assert_eq!(row.original_id, Some(5));
    assert_eq!(row.input.date, NaiveDate::from_ymd_opt(2024, 1, 2));
    assert_eq!(row.input.coord_x, Some(1.5));
    assert_eq!(row.input.zone_letter, Some('K'));
    assert!(row.input.risk_factors.get(0));
    assert!(row.has_photo);
  }

  #[test]
  fn header_only_table_is_empty() {
    let table = parse("\u{feff}ID;Date\r\n");
    assert!(table.rows.is_empty());
    assert!(table.skipped.is_empty());
  }
}
