//! Export and import of the inventory.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use arbor_bundle::ImportReport;
use clap::Args;

use crate::Store;

#[derive(Args)]
pub struct ExportArgs {
  /// Output file. A `.csv` name writes the bare table.
  output:     PathBuf,
  /// Write the bare table regardless of the file name.
  #[arg(long)]
  table_only: bool,
}

#[derive(Args)]
pub struct ImportArgs {
  /// A zip bundle, or a `.csv` table.
  input: PathBuf,
}

fn is_table(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

pub async fn export(inv: &mut Store, args: ExportArgs) -> anyhow::Result<()> {
  let bytes = if args.table_only || is_table(&args.output) {
    arbor_bundle::export_table(inv).into_bytes()
  } else {
    arbor_bundle::export_bundle(inv).await?
  };
  std::fs::write(&args.output, &bytes)
    .with_context(|| format!("failed to write {}", args.output.display()))?;
  println!("exported {} trees to {}", inv.len(), args.output.display());
  Ok(())
}

pub async fn import(inv: &mut Store, args: ImportArgs) -> anyhow::Result<()> {
  let bytes = std::fs::read(&args.input)
    .with_context(|| format!("failed to read {}", args.input.display()))?;

  let report = if is_table(&args.input) {
    let text = String::from_utf8(bytes).context("table is not valid UTF-8")?;
    arbor_bundle::import_table(inv, &text).await?
  } else {
    arbor_bundle::import_bundle(inv, &bytes).await?
  };
  print_report(&report);
  Ok(())
}

fn print_report(r: &ImportReport) {
  match (r.imported.first(), r.imported.last()) {
    (Some(first), Some(last)) => {
      println!("imported {} trees as ids {}..={}", r.imported.len(), first.id, last.id)
    }
    _ => println!("imported 0 trees"),
  }
  if r.photos_restored > 0 || r.photos_missing > 0 {
    println!("photos: {} restored, {} missing", r.photos_restored, r.photos_missing);
  }
  if !r.skipped.is_empty() {
    println!("skipped {} rows:", r.skipped.len());
    for s in &r.skipped {
      println!("    line {}: {}", s.line, s.reason);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_detection_by_extension() {
    assert!(is_table(Path::new("out/inventory.CSV")));
    assert!(!is_table(Path::new("inventory.zip")));
    assert!(!is_table(Path::new("inventory")));
  }
}
