//! Integration tests for `SqliteStore` against an in-memory database.

use arbor_core::{
  Error as CoreError,
  inventory::{Inventory, Notice},
  plan::{InterventionKind, PlanId, PlanRecord, Schedule, TeamComposition},
  risk::{RiskFactors, RiskLevel, RiskWeights},
  store::{InventoryBackend, PhotoStore},
  tree::{Photo, PhotoChange, TreeInput, TreeRecord},
};
use chrono::{NaiveDate, TimeZone as _, Utc};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn day() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 4, 22).unwrap() }

fn record(id: u32, species: &str) -> TreeRecord {
  let mut input = TreeInput::new(species);
  input.location = "Praça da Sé".into();
  input.coord_x = Some(333_288.0);
  input.coord_y = Some(7_394_588.0);
  input.diameter_cm = Some(42.5);
  input.risk_factors = RiskFactors::from_indices([0, 2]);
  TreeRecord::from_input(id, input, &RiskWeights::default(), day())
}

fn jpeg() -> Photo { Photo::new("image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0]) }

// ─── Trees ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_and_load_trees() {
  let s = store().await;
  let a = record(1, "Tipuana tipu");
  let mut b = record(2, "Handroanthus albus");
  b.coord_x = None;
  b.coord_y = None;
  b.notes = "line one\nline two".into();

  s.save_trees(vec![a.clone(), b.clone()]).await.unwrap();

  let loaded = s.load_trees().await.unwrap();
  assert_eq!(loaded, vec![a, b]);
}

#[tokio::test]
async fn save_trees_replaces_existing_rows() {
  let s = store().await;
  s.save_trees(vec![record(1, "Before")]).await.unwrap();
  s.save_trees(vec![record(1, "After")]).await.unwrap();

  let loaded = s.load_trees().await.unwrap();
  assert_eq!(loaded.len(), 1);
  assert_eq!(loaded[0].species, "After");
}

#[tokio::test]
async fn remove_and_clear_trees() {
  let s = store().await;
  s.save_trees(vec![record(1, "A"), record(2, "B"), record(3, "C")])
    .await
    .unwrap();

  s.remove_tree(2).await.unwrap();
  let ids: Vec<_> = s.load_trees().await.unwrap().iter().map(|t| t.id).collect();
  assert_eq!(ids, vec![1, 3]);

  // Removing an absent id is not an error.
  s.remove_tree(2).await.unwrap();

  s.clear_trees().await.unwrap();
  assert!(s.load_trees().await.unwrap().is_empty());
}

// ─── Photos ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn photo_put_get_overwrite_delete() {
  let s = store().await;
  assert_eq!(s.get(1).await.unwrap(), None);

  s.put(1, jpeg()).await.unwrap();
  assert_eq!(s.get(1).await.unwrap(), Some(jpeg()));

  let png = Photo::new("image/png", vec![0x89, b'P', b'N', b'G']);
  s.put(1, png.clone()).await.unwrap();
  assert_eq!(s.get(1).await.unwrap(), Some(png));

  s.delete(1).await.unwrap();
  assert_eq!(s.get(1).await.unwrap(), None);
  s.delete(1).await.unwrap();
}

#[tokio::test]
async fn photo_get_all_ids_and_clear() {
  let s = store().await;
  s.put(3, jpeg()).await.unwrap();
  s.put(1, jpeg()).await.unwrap();

  let all = s.get_all().await.unwrap();
  assert_eq!(all.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![1, 3]);
  assert_eq!(s.ids().await.unwrap(), vec![1, 3]);

  s.clear().await.unwrap();
  assert!(s.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn closed_store_reports_unavailable() {
  let s = store().await;
  let handle = s.clone();
  s.close().await.unwrap();

  let err = handle.get(1).await.unwrap_err();
  assert!(matches!(err, Error::Unavailable), "{err}");
}

// ─── Plans ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn plan_sequence_is_per_year_and_monotonic() {
  let s = store().await;
  assert_eq!(s.next_plan_sequence(2024).await.unwrap(), 1);
  assert_eq!(s.next_plan_sequence(2024).await.unwrap(), 2);
  assert_eq!(s.next_plan_sequence(2025).await.unwrap(), 1);
  assert_eq!(s.next_plan_sequence(2024).await.unwrap(), 3);
}

#[tokio::test]
async fn save_and_load_plan() {
  let s = store().await;
  let plan = PlanRecord {
    id:                PlanId::new(2024, 1),
    tree_id:           7,
    created_at:        Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap(),
    intervention:      InterventionKind::Other("Lightning protection".into()),
    techniques:        vec!["cable install".into()],
    tools:             vec!["climbing kit".into(), "rope".into()],
    ppe:               vec!["helmet".into()],
    team:              TeamComposition { arborists: 2, assistants: 2, operators: 1 },
    schedule:          Schedule { start: day(), end: day() },
    waste_destination: "none".into(),
    responsible:       "R. Lima".into(),
    notes:             "coordinate with utility".into(),
  };

  s.save_plan(plan.clone()).await.unwrap();
  assert_eq!(s.load_plans().await.unwrap(), vec![plan]);
}

// ─── Inventory over SQLite ───────────────────────────────────────────────────

async fn inventory(s: &SqliteStore) -> Inventory<SqliteStore, SqliteStore> {
  Inventory::open(s.clone(), s.clone(), RiskWeights::default())
    .await
    .expect("open inventory")
}

#[tokio::test]
async fn inventory_delete_cascades_photo() {
  let s = store().await;
  let mut inv = inventory(&s).await;

  let rec = inv.add(TreeInput::new("Ficus"), Some(jpeg())).await.unwrap();
  assert!(rec.has_photo);
  assert!(s.get(rec.id).await.unwrap().is_some());

  inv.delete(rec.id).await.unwrap();
  assert!(s.get(rec.id).await.unwrap().is_none());
  assert!(s.load_trees().await.unwrap().is_empty());
  assert_eq!(inv.photo(rec.id).await, None);
}

#[tokio::test]
async fn inventory_state_survives_reopen() {
  let s = store().await;
  {
    let mut inv = inventory(&s).await;
    let rec = inv.add(TreeInput::new("Ipê-roxo"), Some(jpeg())).await.unwrap();
    let mut input = rec.to_input();
    input.risk_factors = RiskFactors::from_indices([8, 9, 10, 11]);
    inv.edit(rec.id, input, PhotoChange::Keep).await.unwrap();
  }

  let inv = inventory(&s).await;
  let rec = inv.get(1).expect("persisted");
  assert_eq!(rec.species, "Ipê-roxo");
  assert_eq!(rec.score, 21);
  assert_eq!(rec.risk_level, RiskLevel::High);
  assert!(rec.has_photo);
}

#[tokio::test]
async fn inventory_rescoring_on_open_is_written_back() {
  let s = store().await;
  let mut stale = record(1, "Ficus");
  stale.score = 55;
  stale.risk_level = RiskLevel::High;
  s.save_trees(vec![stale]).await.unwrap();

  let inv = inventory(&s).await;
  assert_eq!(inv.get(1).unwrap().score, 10);
  assert_eq!(s.load_trees().await.unwrap()[0].score, 10);
}

#[tokio::test]
async fn inventory_open_drops_orphaned_photos() {
  let s = store().await;
  s.save_trees(vec![record(1, "Ficus")]).await.unwrap();
  s.put(9, jpeg()).await.unwrap();

  let mut inv = inventory(&s).await;
  assert!(s.get(9).await.unwrap().is_none());
  assert_eq!(inv.photo(9).await, None);
}

#[tokio::test]
async fn inventory_degrades_when_photo_store_is_closed() {
  let records = store().await;
  let photos = store().await;
  let mut inv = Inventory::open(records.clone(), photos.clone(), RiskWeights::default())
    .await
    .unwrap();
  photos.close().await.unwrap();

  let rec = inv.add(TreeInput::new("Ficus"), Some(jpeg())).await.unwrap();
  assert!(!rec.has_photo);
  assert_eq!(records.load_trees().await.unwrap().len(), 1);

  inv.delete(rec.id).await.unwrap();
  let notices = inv.take_notices();
  assert!(notices.len() >= 2);
  assert!(
    notices
      .iter()
      .all(|n| matches!(n, Notice::PhotoStoreUnavailable { .. }))
  );
}

#[tokio::test]
async fn inventory_validation_error_touches_nothing() {
  let s = store().await;
  let mut inv = inventory(&s).await;
  let err = inv.add(TreeInput::new(""), Some(jpeg())).await.unwrap_err();
  assert!(matches!(err, CoreError::Validation(_)));
  assert!(s.load_trees().await.unwrap().is_empty());
  assert!(s.get_all().await.unwrap().is_empty());
}
