//! [`Inventory`]: the authoritative ledger of tree and plan records.
//!
//! Every mutation commits to the [`InventoryBackend`] before the in-memory
//! map changes, so a successful call never leaves memory and storage apart.
//! Photo-store failures never abort an operation: they are logged, queued as
//! [`Notice`]s, and the record's `has_photo` flag is kept truthful.
//!
//! Mutating methods take `&mut self`, which serialises add/edit/delete/import
//! into non-overlapping transactions.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Datelike as _, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  plan::{PlanId, PlanInput, PlanRecord},
  risk::{RiskLevel, RiskWeights},
  store::{InventoryBackend, PhotoStore},
  tree::{Photo, PhotoChange, TreeId, TreeInput, TreeRecord},
};

// ─── Notices ─────────────────────────────────────────────────────────────────

/// A non-fatal condition the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
  /// The photo store failed; the operation continued without it.
  PhotoStoreUnavailable {
    operation: &'static str,
    detail:    String,
  },
  /// A record claimed a photo that could not be found; its flag was cleared.
  PhotoMissing { tree_id: TreeId },
  /// A stored photo had no matching flag; the flag was set.
  PhotoFlagRestored { tree_id: TreeId },
}

impl fmt::Display for Notice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::PhotoStoreUnavailable { operation, detail } => {
        write!(f, "photo storage unavailable ({operation}): {detail}")
      }
      Self::PhotoMissing { tree_id } => {
        write!(f, "tree {tree_id}: photo not found, marked as without photo")
      }
      Self::PhotoFlagRestored { tree_id } => {
        write!(f, "tree {tree_id}: stored photo found, marked as with photo")
      }
    }
  }
}

// ─── Import entry ────────────────────────────────────────────────────────────

/// One accepted row handed to [`Inventory::import`]. The codec resolves the
/// photo (looked up by the row's original id) before the ledger assigns the
/// new id.
#[derive(Debug, Clone)]
pub struct ImportEntry {
  pub input:          TreeInput,
  /// Whether the row claimed to carry a photo.
  pub declared_photo: bool,
  pub photo:          Option<Photo>,
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskSummary {
  pub total:      usize,
  pub low:        usize,
  pub medium:     usize,
  pub high:       usize,
  pub with_photo: usize,
}

// ─── Inventory ───────────────────────────────────────────────────────────────

pub struct Inventory<B, P> {
  backend: B,
  photos:  P,
  weights: RiskWeights,
  trees:   BTreeMap<TreeId, TreeRecord>,
  plans:   Vec<PlanRecord>,
  notices: Vec<Notice>,
}

impl<B, P> Inventory<B, P>
where
  B: InventoryBackend,
  P: PhotoStore,
{
  /// Load the persisted snapshot and repair it.
  ///
  /// Persisted scores are an untrusted cache and are recomputed; photo flags
  /// are reconciled against the photo store. Repaired records are written
  /// back before this returns.
  pub async fn open(backend: B, photos: P, weights: RiskWeights) -> Result<Self> {
    let stored = backend.load_trees().await.map_err(Error::backend)?;
    let plans = backend.load_plans().await.map_err(Error::backend)?;

    let mut inv = Self {
      backend,
      photos,
      weights,
      trees: BTreeMap::new(),
      plans,
      notices: Vec::new(),
    };

    let photo_ids = {
      let res = inv.photos.ids().await;
      inv.degrade("ids", res)
    };

    let mut repaired = Vec::new();
    for mut rec in stored {
      let mut dirty = rec.rescore(&inv.weights);
      if let Some(ids) = &photo_ids {
        let present = ids.contains(&rec.id);
        if rec.has_photo != present {
          inv.notices.push(if present {
            Notice::PhotoFlagRestored { tree_id: rec.id }
          } else {
            Notice::PhotoMissing { tree_id: rec.id }
          });
          rec.has_photo = present;
          dirty = true;
        }
      }
      if dirty {
        repaired.push(rec.clone());
      }
      inv.trees.insert(rec.id, rec);
    }

    if !repaired.is_empty() {
      info!(count = repaired.len(), "repaired stale tree records on load");
      inv.backend.save_trees(repaired).await.map_err(Error::backend)?;
    }

    // Blobs left behind by a delete that ran while the photo store was down.
    let orphans: Vec<TreeId> = photo_ids
      .unwrap_or_default()
      .into_iter()
      .filter(|id| !inv.trees.contains_key(id))
      .collect();
    for id in orphans {
      debug!(id, "removing photo without a tree record");
      let res = inv.photos.delete(id).await;
      inv.degrade("delete", res);
    }

    Ok(inv)
  }

  // ── Accessors ─────────────────────────────────────────────────────────────

  pub fn weights(&self) -> &RiskWeights { &self.weights }

  pub fn get(&self, id: TreeId) -> Option<&TreeRecord> { self.trees.get(&id) }

  /// All records ordered by id.
  pub fn trees(&self) -> impl Iterator<Item = &TreeRecord> { self.trees.values() }

  pub fn len(&self) -> usize { self.trees.len() }

  pub fn is_empty(&self) -> bool { self.trees.is_empty() }

  pub fn max_id(&self) -> Option<TreeId> { self.trees.keys().next_back().copied() }

  /// The id the next added or imported record will receive.
  pub fn next_id(&self) -> TreeId { self.max_id().map_or(1, |m| m + 1) }

  pub fn summary(&self) -> RiskSummary {
    let mut s = RiskSummary { total: self.trees.len(), ..RiskSummary::default() };
    for t in self.trees.values() {
      match t.risk_level {
        RiskLevel::Low => s.low += 1,
        RiskLevel::Medium => s.medium += 1,
        RiskLevel::High => s.high += 1,
      }
      if t.has_photo {
        s.with_photo += 1;
      }
    }
    s
  }

  /// Drain queued notices for display.
  pub fn take_notices(&mut self) -> Vec<Notice> { std::mem::take(&mut self.notices) }

  /// The photo stored for `id`, or `None` if absent, unreachable, or `id`
  /// has no record.
  pub async fn photo(&mut self, id: TreeId) -> Option<Photo> {
    if !self.trees.contains_key(&id) {
      return None;
    }
    let res = self.photos.get(id).await;
    self.degrade("get", res).flatten()
  }

  /// Every stored photo belonging to a current record.
  pub async fn photos(&mut self) -> Vec<(TreeId, Photo)> {
    let res = self.photos.get_all().await;
    let mut all = self.degrade("get_all", res).unwrap_or_default();
    all.retain(|(id, _)| self.trees.contains_key(id));
    all
  }

  // ── Trees ─────────────────────────────────────────────────────────────────

  /// Validate, score, and commit a new record under `max(ids) + 1`.
  pub async fn add(&mut self, input: TreeInput, photo: Option<Photo>) -> Result<TreeRecord> {
    validate(&input)?;

    let id = self.next_id();
    let mut rec = TreeRecord::from_input(id, input, &self.weights, today());

    rec.has_photo = match photo {
      Some(p) => self.put_photo(id, p).await,
      None => {
        // Scrub any blob left behind by an earlier holder of this id.
        let res = self.photos.delete(id).await;
        self.degrade("delete", res);
        false
      }
    };

    if let Err(e) = self.backend.save_trees(vec![rec.clone()]).await {
      if rec.has_photo {
        let res = self.photos.delete(id).await;
        self.degrade("delete", res);
      }
      return Err(Error::backend(e));
    }

    info!(id, species = %rec.species, score = rec.score, level = %rec.risk_level, "tree added");
    self.trees.insert(id, rec.clone());
    Ok(rec)
  }

  /// Replace the fields of an existing record, keeping its id and
  /// recomputing its assessment.
  pub async fn edit(
    &mut self,
    id: TreeId,
    input: TreeInput,
    photo: PhotoChange,
  ) -> Result<TreeRecord> {
    let existing = self.trees.get(&id).ok_or(Error::TreeNotFound(id))?.clone();
    validate(&input)?;

    let date = input.date.unwrap_or(existing.date);
    let mut rec = TreeRecord::from_input(id, input, &self.weights, date);

    rec.has_photo = match photo {
      PhotoChange::Keep => existing.has_photo,
      PhotoChange::Replace(p) => self.put_photo(id, p).await || existing.has_photo,
      PhotoChange::Remove => {
        let res = self.photos.delete(id).await;
        match self.degrade("delete", res) {
          Some(()) => false,
          None => existing.has_photo,
        }
      }
    };

    self.backend.save_trees(vec![rec.clone()]).await.map_err(Error::backend)?;

    info!(id, score = rec.score, level = %rec.risk_level, "tree updated");
    self.trees.insert(id, rec.clone());
    Ok(rec)
  }

  /// Remove a record and its photo.
  pub async fn delete(&mut self, id: TreeId) -> Result<TreeRecord> {
    if !self.trees.contains_key(&id) {
      return Err(Error::TreeNotFound(id));
    }

    self.backend.remove_tree(id).await.map_err(Error::backend)?;
    let removed = self.trees.remove(&id).ok_or(Error::TreeNotFound(id))?;

    let res = self.photos.delete(id).await;
    self.degrade("delete", res);

    info!(id, "tree deleted");
    Ok(removed)
  }

  /// Remove every tree record and every photo. Plans are kept.
  pub async fn clear_all(&mut self) -> Result<usize> {
    self.backend.clear_trees().await.map_err(Error::backend)?;
    let count = self.trees.len();
    self.trees.clear();

    let res = self.photos.clear().await;
    self.degrade("clear", res);

    info!(count, "inventory cleared");
    Ok(count)
  }

  /// Commit imported rows in order, assigning each a fresh id.
  ///
  /// Entries are validated up front; if any is invalid nothing is written.
  /// Rows that declared a photo but arrive without one are committed with
  /// `has_photo = false` and reported as [`Notice::PhotoMissing`].
  pub async fn import(&mut self, entries: Vec<ImportEntry>) -> Result<Vec<TreeRecord>> {
    for e in &entries {
      validate(&e.input)?;
    }

    let mut next = self.next_id();
    let mut records = Vec::with_capacity(entries.len());
    let mut stored_photos = Vec::new();

    for entry in entries {
      let id = next;
      next += 1;

      let mut rec = TreeRecord::from_input(id, entry.input, &self.weights, today());
      rec.has_photo = match entry.photo {
        Some(p) => self.put_photo(id, p).await,
        None => {
          let res = self.photos.delete(id).await;
          self.degrade("delete", res);
          false
        }
      };
      if rec.has_photo {
        stored_photos.push(id);
      } else if entry.declared_photo {
        debug!(id, "declared photo not available; clearing flag");
        self.notices.push(Notice::PhotoMissing { tree_id: id });
      }
      records.push(rec);
    }

    if let Err(e) = self.backend.save_trees(records.clone()).await {
      for id in stored_photos {
        let res = self.photos.delete(id).await;
        self.degrade("delete", res);
      }
      return Err(Error::backend(e));
    }

    for rec in &records {
      self.trees.insert(rec.id, rec.clone());
    }
    info!(count = records.len(), "trees imported");
    Ok(records)
  }

  // ── Plans ─────────────────────────────────────────────────────────────────

  pub fn plans(&self) -> &[PlanRecord] { &self.plans }

  pub fn plans_for(&self, tree_id: TreeId) -> impl Iterator<Item = &PlanRecord> {
    self.plans.iter().filter(move |p| p.tree_id == tree_id)
  }

  pub async fn create_plan(&mut self, tree_id: TreeId, input: PlanInput) -> Result<PlanRecord> {
    self.create_plan_at(tree_id, input, Utc::now()).await
  }

  /// Create a plan as of `now`; the plan-id year is taken from `now`.
  pub async fn create_plan_at(
    &mut self,
    tree_id: TreeId,
    input: PlanInput,
    now: DateTime<Utc>,
  ) -> Result<PlanRecord> {
    if !self.trees.contains_key(&tree_id) {
      return Err(Error::TreeNotFound(tree_id));
    }
    input.validate()?;

    let year = now.year();
    let seq = self
      .backend
      .next_plan_sequence(year)
      .await
      .map_err(Error::backend)?;
    let plan = PlanRecord::from_input(PlanId::new(year, seq), tree_id, now, input);

    self.backend.save_plan(plan.clone()).await.map_err(Error::backend)?;
    info!(plan = %plan.id, tree_id, "intervention plan created");
    self.plans.push(plan.clone());
    Ok(plan)
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  async fn put_photo(&mut self, id: TreeId, photo: Photo) -> bool {
    let res = self.photos.put(id, photo).await;
    self.degrade("put", res).is_some()
  }

  fn degrade<T>(&mut self, operation: &'static str, res: Result<T, P::Error>) -> Option<T> {
    match res {
      Ok(v) => Some(v),
      Err(e) => {
        warn!(operation, error = %e, "photo store unavailable; continuing without it");
        self
          .notices
          .push(Notice::PhotoStoreUnavailable { operation, detail: e.to_string() });
        None
      }
    }
  }
}

fn validate(input: &TreeInput) -> Result<()> {
  if input.species.trim().is_empty() {
    return Err(Error::Validation("species is required".into()));
  }
  Ok(())
}

fn today() -> NaiveDate { Utc::now().date_naive() }
