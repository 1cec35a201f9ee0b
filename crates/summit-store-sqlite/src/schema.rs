//! SQL schema for the Summit SQLite store.
//!
//! Executed on first open, gated on `PRAGMA user_version`. Stores written by
//! older releases have to be migrated by the upgrade tool before they can be
//! attached; this crate only ever speaks the current version.

/// Schema version written to `PRAGMA user_version`.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Per-connection settings; executed on every open.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS countries (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE COLLATE NOCASE
);

CREATE TABLE IF NOT EXISTS ranges (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    continent  TEXT              -- snake_case Continent or NULL
);

CREATE TABLE IF NOT EXISTS regions (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    range_id    INTEGER REFERENCES ranges(id),
    country_id  INTEGER REFERENCES countries(id)
);

CREATE TABLE IF NOT EXISTS peaks (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    height      INTEGER,
    is_volcano  INTEGER NOT NULL DEFAULT 0,
    region_id   INTEGER REFERENCES regions(id),
    maps_link   TEXT,
    earth_link  TEXT,
    wiki_link   TEXT
);

CREATE TABLE IF NOT EXISTS trips (
    id           INTEGER PRIMARY KEY,
    name         TEXT NOT NULL,
    start_date   TEXT,            -- YYYY-MM-DD
    end_date     TEXT,
    description  TEXT,
    CHECK ((start_date IS NULL) = (end_date IS NULL))
);

CREATE TABLE IF NOT EXISTS hikers (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ascents (
    id                 INTEGER PRIMARY KEY,
    title              TEXT,
    peak_id            INTEGER REFERENCES peaks(id),
    date               TEXT,      -- YYYY-MM-DD
    time               TEXT,      -- HH:MM:SS, local
    elevation_gain     INTEGER,
    kind               TEXT NOT NULL DEFAULT 'normal',
    is_traverse        INTEGER NOT NULL DEFAULT 0,
    difficulty_system  TEXT,
    difficulty_grade   TEXT,
    trip_id            INTEGER REFERENCES trips(id),
    description        TEXT,
    CHECK (difficulty_system IS NOT NULL OR difficulty_grade IS NULL)
);

-- Many-to-many link between ascents and hikers.
CREATE TABLE IF NOT EXISTS participation (
    ascent_id  INTEGER NOT NULL REFERENCES ascents(id),
    hiker_id   INTEGER NOT NULL REFERENCES hikers(id),
    PRIMARY KEY (ascent_id, hiker_id)
);

-- sort_index is kept contiguous per ascent by the store, not by a
-- constraint, so that renumbering can shift rows in place.
CREATE TABLE IF NOT EXISTS photos (
    id           INTEGER PRIMARY KEY,
    ascent_id    INTEGER NOT NULL REFERENCES ascents(id),
    sort_index   INTEGER NOT NULL,
    file_path    TEXT NOT NULL,
    description  TEXT
);

CREATE INDEX IF NOT EXISTS regions_range_idx     ON regions(range_id);
CREATE INDEX IF NOT EXISTS regions_country_idx   ON regions(country_id);
CREATE INDEX IF NOT EXISTS peaks_region_idx      ON peaks(region_id);
CREATE INDEX IF NOT EXISTS ascents_peak_idx      ON ascents(peak_id);
CREATE INDEX IF NOT EXISTS ascents_trip_idx      ON ascents(trip_id);
CREATE INDEX IF NOT EXISTS participation_hiker   ON participation(hiker_id);
CREATE INDEX IF NOT EXISTS photos_ascent_idx     ON photos(ascent_id, sort_index);

PRAGMA user_version = 1;
";
