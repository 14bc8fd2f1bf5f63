//! [`SqliteStore`]: the SQLite implementation of [`InventoryBackend`] and
//! [`PhotoStore`].

use std::path::Path;

use arbor_core::{
  plan::PlanRecord,
  store::{InventoryBackend, PhotoStore},
  tree::{Photo, TreeId, TreeRecord},
};
use bytes::Bytes;
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;

use crate::{
  Result,
  encode::{PlanRow, TreeRow, decode_id, encode_dt},
  schema::SCHEMA,
};

const TREE_COLUMNS: &str = "tree_id, date, species, location, coord_x, coord_y,
  zone_number, zone_letter, diameter_cm, height_m, distance_m, observer, notes,
  risk_factors, score, risk_level, has_photo";

const PLAN_COLUMNS: &str = "plan_id, tree_id, created_at, intervention,
  techniques, tools, ppe, team, schedule_start, schedule_end,
  waste_destination, responsible, notes";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Arbor inventory backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Pass one
/// clone as the record backend and another as the photo store.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    debug!(path = %path.display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Close the underlying connection. Every clone becomes unavailable;
  /// later calls fail with [`crate::Error::Unavailable`].
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── InventoryBackend impl ───────────────────────────────────────────────────

impl InventoryBackend for SqliteStore {
  type Error = crate::Error;

  async fn load_trees(&self) -> Result<Vec<TreeRecord>> {
    let rows: Vec<TreeRow> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {TREE_COLUMNS} FROM trees ORDER BY tree_id"))?;
        let rows = stmt
          .query_map([], TreeRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(TreeRow::into_record).collect()
  }

  async fn save_trees(&self, trees: Vec<TreeRecord>) -> Result<()> {
    let rows = trees.iter().map(TreeRow::encode).collect::<Result<Vec<_>>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&format!(
            "INSERT OR REPLACE INTO trees ({TREE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
          ))?;
          for r in &rows {
            stmt.execute(rusqlite::params![
              r.tree_id,
              r.date,
              r.species,
              r.location,
              r.coord_x,
              r.coord_y,
              r.zone_number,
              r.zone_letter,
              r.diameter_cm,
              r.height_m,
              r.distance_m,
              r.observer,
              r.notes,
              r.risk_factors,
              r.score,
              r.risk_level,
              r.has_photo,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_tree(&self, id: TreeId) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM trees WHERE tree_id = ?1", rusqlite::params![id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn clear_trees(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute("DELETE FROM trees", [])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn load_plans(&self) -> Result<Vec<PlanRecord>> {
    let rows: Vec<PlanRow> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PLAN_COLUMNS} FROM plans ORDER BY created_at, plan_id"
        ))?;
        let rows = stmt
          .query_map([], PlanRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(PlanRow::into_record).collect()
  }

  async fn next_plan_sequence(&self, year: i32) -> Result<u32> {
    let seq: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO plan_counters (year, last_seq) VALUES (?1, 1)
           ON CONFLICT(year) DO UPDATE SET last_seq = last_seq + 1
           RETURNING last_seq",
          rusqlite::params![year],
          |row| row.get(0),
        )?)
      })
      .await?;

    u32::try_from(seq).map_err(|_| crate::Error::Decode {
      column: "last_seq",
      value:  seq.to_string(),
    })
  }

  async fn save_plan(&self, plan: PlanRecord) -> Result<()> {
    let r = PlanRow::encode(&plan)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO plans ({PLAN_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
          ),
          rusqlite::params![
            r.plan_id,
            r.tree_id,
            r.created_at,
            r.intervention,
            r.techniques,
            r.tools,
            r.ppe,
            r.team,
            r.schedule_start,
            r.schedule_end,
            r.waste_destination,
            r.responsible,
            r.notes,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── PhotoStore impl ─────────────────────────────────────────────────────────

impl PhotoStore for SqliteStore {
  type Error = crate::Error;

  async fn put(&self, tree_id: TreeId, photo: Photo) -> Result<()> {
    let at_str = encode_dt(Utc::now());
    let Photo { content_type, data } = photo;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO photos (tree_id, content_type, data, stored_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![tree_id, content_type, &data[..], at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get(&self, tree_id: TreeId) -> Result<Option<Photo>> {
    let raw: Option<(String, Vec<u8>)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT content_type, data FROM photos WHERE tree_id = ?1",
              rusqlite::params![tree_id],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(|(content_type, data)| Photo { content_type, data: Bytes::from(data) }))
  }

  async fn delete(&self, tree_id: TreeId) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM photos WHERE tree_id = ?1", rusqlite::params![tree_id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_all(&self) -> Result<Vec<(TreeId, Photo)>> {
    let raws: Vec<(i64, String, Vec<u8>)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT tree_id, content_type, data FROM photos ORDER BY tree_id")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(id, content_type, data)| -> Result<(TreeId, Photo)> {
        Ok((decode_id(id)?, Photo { content_type, data: Bytes::from(data) }))
      })
      .collect()
  }

  async fn ids(&self) -> Result<Vec<TreeId>> {
    let raws: Vec<i64> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT tree_id FROM photos ORDER BY tree_id")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(decode_id).collect()
  }

  async fn clear(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute("DELETE FROM photos", [])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
