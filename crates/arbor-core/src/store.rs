//! Storage traits implemented by persistence backends (e.g.
//! `arbor-store-sqlite`).
//!
//! [`Inventory`](crate::inventory::Inventory) depends on these abstractions,
//! never on a concrete backend, so tests can run against in-memory doubles.

use std::future::Future;

use crate::{
  plan::PlanRecord,
  tree::{Photo, TreeId, TreeRecord},
};

// ─── Photo blobs ─────────────────────────────────────────────────────────────

/// Asynchronous binary object store keyed by tree id.
///
/// The store enforces no cross-referential invariant: keeping
/// `TreeRecord::has_photo` consistent is the caller's job.
pub trait PhotoStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `photo` under `tree_id`, replacing any existing payload.
  fn put(
    &self,
    tree_id: TreeId,
    photo: Photo,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Fetch the payload stored under `tree_id`, if any.
  fn get(
    &self,
    tree_id: TreeId,
  ) -> impl Future<Output = Result<Option<Photo>, Self::Error>> + Send + '_;

  /// Remove the payload under `tree_id`. Absent ids are not an error.
  fn delete(
    &self,
    tree_id: TreeId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every stored payload, ordered by tree id.
  fn get_all(
    &self,
  ) -> impl Future<Output = Result<Vec<(TreeId, Photo)>, Self::Error>> + Send + '_;

  /// Ids that currently have a payload, without loading the payloads.
  fn ids(
    &self,
  ) -> impl Future<Output = Result<Vec<TreeId>, Self::Error>> + Send + '_;

  fn clear(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Record snapshot ─────────────────────────────────────────────────────────

/// Durable snapshot of tree and plan records plus the plan-id counter.
///
/// Every write is atomic: either all of a batch lands or none of it does.
pub trait InventoryBackend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn load_trees(
    &self,
  ) -> impl Future<Output = Result<Vec<TreeRecord>, Self::Error>> + Send + '_;

  /// Insert or replace every record in `trees` in one transaction.
  fn save_trees(
    &self,
    trees: Vec<TreeRecord>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn remove_tree(
    &self,
    id: TreeId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn clear_trees(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn load_plans(
    &self,
  ) -> impl Future<Output = Result<Vec<PlanRecord>, Self::Error>> + Send + '_;

  /// Advance and return the plan sequence for `year` (first call yields 1).
  fn next_plan_sequence(
    &self,
    year: i32,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  fn save_plan(
    &self,
    plan: PlanRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
