//! SQL schema for the Arbor SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS trees (
    tree_id      INTEGER PRIMARY KEY,
    date         TEXT    NOT NULL,   -- YYYY-MM-DD
    species      TEXT    NOT NULL,
    location     TEXT    NOT NULL DEFAULT '',
    coord_x      REAL,               -- NULL = not available
    coord_y      REAL,
    zone_number  INTEGER NOT NULL,
    zone_letter  TEXT    NOT NULL,
    diameter_cm  REAL,
    height_m     REAL,
    distance_m   REAL,
    observer     TEXT    NOT NULL DEFAULT '',
    notes        TEXT    NOT NULL DEFAULT '',
    risk_factors TEXT    NOT NULL,   -- JSON array of booleans
    score        INTEGER NOT NULL,   -- cache only; recomputed on load
    risk_level   TEXT    NOT NULL,   -- 'low' | 'medium' | 'high'
    has_photo    INTEGER NOT NULL DEFAULT 0
);

-- Photo payloads keyed by tree id. No foreign key: the blob store carries
-- no cross-referential invariant of its own.
CREATE TABLE IF NOT EXISTS photos (
    tree_id      INTEGER PRIMARY KEY,
    content_type TEXT    NOT NULL,
    data         BLOB    NOT NULL,
    stored_at    TEXT    NOT NULL    -- ISO 8601 UTC
);

-- Plans reference a tree without owning it; deleting the tree keeps them.
CREATE TABLE IF NOT EXISTS plans (
    plan_id           TEXT PRIMARY KEY,
    tree_id           INTEGER NOT NULL,
    created_at        TEXT NOT NULL,
    intervention      TEXT NOT NULL,   -- JSON-encoded InterventionKind
    techniques        TEXT NOT NULL DEFAULT '[]',
    tools             TEXT NOT NULL DEFAULT '[]',
    ppe               TEXT NOT NULL DEFAULT '[]',
    team              TEXT NOT NULL,   -- JSON-encoded TeamComposition
    schedule_start    TEXT NOT NULL,
    schedule_end      TEXT NOT NULL,
    waste_destination TEXT NOT NULL DEFAULT '',
    responsible       TEXT NOT NULL DEFAULT '',
    notes             TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS plan_counters (
    year     INTEGER PRIMARY KEY,
    last_seq INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS plans_tree_idx ON plans(tree_id);

PRAGMA user_version = 1;
";
