//! Export/import codec for the Arbor inventory.
//!
//! An export is a zip bundle holding the inventory table (`inventory.csv`)
//! and one `images/tree_<id>.<ext>` entry per photographed tree. Import
//! reverses it: rows are committed in order under fresh ids, scores are
//! recomputed, and each row's photo is looked up under the id it was
//! exported with.
//!
//! # Quick start
//!
//! ```no_run
//! # async fn demo(
//! #   inv: &mut arbor_core::inventory::Inventory<
//! #     arbor_store_sqlite::SqliteStore,
//! #     arbor_store_sqlite::SqliteStore,
//! #   >,
//! # ) -> arbor_bundle::Result<()> {
//! let bytes = arbor_bundle::export_bundle(inv).await?;
//! let report = arbor_bundle::import_bundle(inv, &bytes).await?;
//! println!("{} imported, {} skipped", report.imported.len(), report.skipped.len());
//! # Ok(())
//! # }
//! ```

mod archive;
pub mod error;
pub mod table;

use arbor_core::{
  inventory::{ImportEntry, Inventory},
  store::{InventoryBackend, PhotoStore},
  tree::{Photo, TreeId, TreeRecord},
};
pub use error::{Error, Result};
pub use table::SkippedRow;
use tracing::info;

/// Name of the table entry inside a bundle.
pub const MANIFEST_NAME: &str = "inventory.csv";

/// Outcome of an import.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
  /// Committed records, in table order, with their new ids.
  pub imported:        Vec<TreeRecord>,
  pub skipped:         Vec<SkippedRow>,
  /// Rows whose photo was found and stored under the new id.
  pub photos_restored: usize,
  /// Rows that declared a photo that could not be restored.
  pub photos_missing:  usize,
}

// ─── Export ──────────────────────────────────────────────────────────────────

/// Render every record as the inventory table.
pub fn export_table<B, P>(inv: &Inventory<B, P>) -> String
where
  B: InventoryBackend,
  P: PhotoStore,
{
  table::serialize(inv.trees())
}

/// Build a zip bundle of the table and every stored photo.
///
/// Takes `&mut` because photo-store failures are queued as notices on the
/// inventory; an unreachable photo store yields a bundle without images.
pub async fn export_bundle<B, P>(inv: &mut Inventory<B, P>) -> Result<Vec<u8>>
where
  B: InventoryBackend,
  P: PhotoStore,
{
  let mut photos = inv.photos().await;
  photos.retain(|(id, _)| inv.get(*id).is_some_and(|t| t.has_photo));

  let table = export_table(inv);
  let bytes = archive::write(&table, &photos)?;
  info!(trees = inv.len(), photos = photos.len(), bytes = bytes.len(), "bundle exported");
  Ok(bytes)
}

// ─── Import ──────────────────────────────────────────────────────────────────

/// Import a zip bundle. A bundle without a table aborts before anything is
/// committed.
pub async fn import_bundle<B, P>(inv: &mut Inventory<B, P>, bytes: &[u8]) -> Result<ImportReport>
where
  B: InventoryBackend,
  P: PhotoStore,
{
  let archive::Contents { table, mut images } = archive::read(bytes)?;
  commit(inv, &table, |id| images.remove(&id)).await
}

/// Import a bare table. Its rows can never carry photos.
pub async fn import_table<B, P>(inv: &mut Inventory<B, P>, text: &str) -> Result<ImportReport>
where
  B: InventoryBackend,
  P: PhotoStore,
{
  commit(inv, text, |_| None).await
}

async fn commit<B, P, F>(
  inv: &mut Inventory<B, P>,
  text: &str,
  mut photo_for: F,
) -> Result<ImportReport>
where
  B: InventoryBackend,
  P: PhotoStore,
  F: FnMut(TreeId) -> Option<Photo>,
{
  let parsed = table::parse(text);

  let entries: Vec<ImportEntry> = parsed
    .rows
    .into_iter()
    .map(|row| {
      let photo = if row.has_photo { row.original_id.and_then(&mut photo_for) } else { None };
      ImportEntry { input: row.input, declared_photo: row.has_photo, photo }
    })
    .collect();
  let declared: Vec<bool> = entries.iter().map(|e| e.declared_photo).collect();

  let imported = inv.import(entries).await?;

  let photos_restored = imported.iter().filter(|r| r.has_photo).count();
  let photos_missing = imported
    .iter()
    .zip(&declared)
    .filter(|(r, declared)| **declared && !r.has_photo)
    .count();

  info!(
    imported = imported.len(),
    skipped = parsed.skipped.len(),
    photos_restored,
    photos_missing,
    "import finished"
  );
  Ok(ImportReport { imported, skipped: parsed.skipped, photos_restored, photos_missing })
}

#[cfg(test)]
mod roundtrip_tests {
  use std::io::{Cursor, Write as _};

  use arbor_core::{
    inventory::Notice,
    risk::{RiskFactors, RiskWeights},
    tree::TreeInput,
  };
  use arbor_store_sqlite::SqliteStore;
  use zip::{ZipWriter, write::SimpleFileOptions};

  use super::*;

  type Inv = Inventory<SqliteStore, SqliteStore>;

  async fn inventory() -> Inv {
    let store = SqliteStore::open_in_memory().await.expect("in-memory store");
    Inventory::open(store.clone(), store, RiskWeights::default())
      .await
      .expect("open inventory")
  }

  fn jpeg(tag: u8) -> Photo { Photo::new("image/jpeg", vec![0xFF, 0xD8, tag]) }

  fn tree(species: &str, factors: &[usize]) -> TreeInput {
    let mut input = TreeInput::new(species);
    input.location = format!("{species} street; north side");
    input.diameter_cm = Some(30.5);
    input.height_m = Some(12.0);
    input.coord_x = Some(333_000.0);
    input.coord_y = Some(7_394_000.0);
    input.risk_factors = RiskFactors::from_indices(factors.iter().copied());
    input
  }

  async fn populated() -> Inv {
    let mut inv = inventory().await;
    inv.add(tree("Tipuana", &[0, 2]), Some(jpeg(1))).await.unwrap();
    inv.add(tree("Ipê", &[]), None).await.unwrap();
    inv.add(tree("Sibipiruna", &[8, 9, 10, 11]), Some(jpeg(3))).await.unwrap();
    inv
  }

  #[tokio::test]
  async fn export_then_import_preserves_records() {
    let mut source = populated().await;
    let bytes = export_bundle(&mut source).await.unwrap();

    let mut target = inventory().await;
    let report = import_bundle(&mut target, &bytes).await.unwrap();

    assert_eq!(report.imported.len(), 3);
    assert!(report.skipped.is_empty());
    assert_eq!(report.photos_restored, 2);
    assert_eq!(report.photos_missing, 0);

    for (orig, new) in source.trees().zip(target.trees()) {
      assert_eq!(orig.species, new.species);
      assert_eq!(orig.location, new.location.replace(',', ";"));
      assert_eq!(orig.diameter_cm, new.diameter_cm);
      assert_eq!(orig.height_m, new.height_m);
      assert_eq!(orig.coord_x, new.coord_x);
      assert_eq!(orig.score, new.score);
      assert_eq!(orig.risk_level, new.risk_level);
      assert_eq!(orig.risk_factors, new.risk_factors);
      assert_eq!(orig.has_photo, new.has_photo);
    }
    assert_eq!(target.photo(3).await, Some(jpeg(3)));
  }

  #[tokio::test]
  async fn padded_free_text_survives_bundle_roundtrip() {
    let mut source = inventory().await;
    let mut input = tree("Tipuana", &[0]);
    input.location = "  Rua A, 10 ".into();
    input.observer = " A. Reis ".into();
    source.add(input, None).await.unwrap();

    let bytes = export_bundle(&mut source).await.unwrap();
    let mut target = inventory().await;
    import_bundle(&mut target, &bytes).await.unwrap();

    let new = target.get(1).unwrap();
    assert_eq!(new.location, "  Rua A, 10 ");
    assert_eq!(new.observer, " A. Reis ");
  }

  #[tokio::test]
  async fn import_appends_after_existing_ids_and_moves_photos() {
    let mut source = populated().await;
    let bytes = export_bundle(&mut source).await.unwrap();

    let mut target = inventory().await;
    target.add(TreeInput::new("Existing"), None).await.unwrap();
    let report = import_bundle(&mut target, &bytes).await.unwrap();

    let ids: Vec<_> = report.imported.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 3, 4]);
    // Exported as tree 1, committed as tree 2.
    assert_eq!(target.photo(2).await, Some(jpeg(1)));
    assert_eq!(target.photo(4).await, Some(jpeg(3)));
    assert_eq!(target.photo(3).await, None);
  }

  #[tokio::test]
  async fn declared_photo_without_payload_is_cleared() {
    let text = format!(
      "{}\r\n5;2024-02-01;Ficus;;;23;K;;;;;;0;Low;;0;Yes\r\n",
      table::HEADER.join(";")
    );
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(MANIFEST_NAME, SimpleFileOptions::default()).unwrap();
    zip.write_all(text.as_bytes()).unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let mut inv = inventory().await;
    let report = import_bundle(&mut inv, &bytes).await.unwrap();

    assert_eq!(report.photos_missing, 1);
    assert!(!report.imported[0].has_photo);
    assert!(!inv.get(1).unwrap().has_photo);
    assert!(inv.take_notices().contains(&Notice::PhotoMissing { tree_id: 1 }));
  }

  #[tokio::test]
  async fn missing_manifest_commits_nothing() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("images/tree_1.jpg", SimpleFileOptions::default()).unwrap();
    zip.write_all(&[0xFF, 0xD8]).unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let mut inv = inventory().await;
    let err = import_bundle(&mut inv, &bytes).await.unwrap_err();
    assert!(matches!(err, Error::MissingManifest));
    assert!(inv.is_empty());
    assert!(inv.photos().await.is_empty());
  }

  #[tokio::test]
  async fn bare_table_import_reports_skipped_rows() {
    let source = populated().await;
    let mut text = export_table(&source);
    text.push_str("9;2024-01-01;truncated\r\n");
    text.push_str(";2024-01-01;;;;23;K;;;;;;0;Low;;0;No\r\n");

    let mut target = inventory().await;
    let report = import_table(&mut target, &text).await.unwrap();

    assert_eq!(report.imported.len(), 3);
    assert_eq!(report.skipped.len(), 2);
    // Table-only imports cannot carry photos.
    assert_eq!(report.photos_missing, 2);
    assert_eq!(target.summary().with_photo, 0);
  }

  #[tokio::test]
  async fn persisted_scores_in_table_are_ignored() {
    let text = format!(
      "{}\r\n1;2024-02-01;Ficus;;;23;K;;;;;;999;High;;1,0,0,0;No\r\n",
      table::HEADER.join(";")
    );
    let mut inv = inventory().await;
    let report = import_table(&mut inv, &text).await.unwrap();
    assert_eq!(report.imported[0].score, 5);
    assert_eq!(report.imported[0].risk_level, arbor_core::risk::RiskLevel::Low);
  }
}
