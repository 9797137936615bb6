//! SQL schema for the skyreplay SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per pilot per poll cycle. Rows are never updated; they leave the
-- table only through the retention sweep. (timestamp, callsign) is not
-- unique: re-ingesting a cycle is tolerated.
CREATE TABLE IF NOT EXISTS pilots (
    row_id       INTEGER PRIMARY KEY,
    timestamp    INTEGER NOT NULL,   -- epoch seconds of the poll cycle
    callsign     TEXT    NOT NULL CHECK (length(callsign) > 0),
    subject_id   INTEGER NOT NULL,
    latitude     REAL    NOT NULL,
    longitude    REAL    NOT NULL,
    altitude     INTEGER,
    groundspeed  INTEGER,
    heading      INTEGER,
    airspace     TEXT,               -- label assigned at ingest
    departure    TEXT,
    destination  TEXT
);

CREATE TABLE IF NOT EXISTS controllers (
    row_id       INTEGER PRIMARY KEY,
    timestamp    INTEGER NOT NULL,
    callsign     TEXT    NOT NULL CHECK (length(callsign) > 0),
    subject_id   INTEGER NOT NULL,
    frequency    TEXT,
    facility     INTEGER,
    latitude     REAL,
    longitude    REAL
);

-- Intervals exempt from pruning. Bounds are inclusive.
CREATE TABLE IF NOT EXISTS protected_ranges (
    range_id     INTEGER PRIMARY KEY,
    start_ts     INTEGER NOT NULL,
    end_ts       INTEGER NOT NULL,
    label        TEXT,
    created_at   TEXT    NOT NULL,   -- RFC 3339 UTC
    CHECK (start_ts <= end_ts)
);

CREATE INDEX IF NOT EXISTS pilots_timestamp_idx        ON pilots(timestamp);
CREATE INDEX IF NOT EXISTS pilots_airspace_ts_idx      ON pilots(airspace, timestamp);
CREATE INDEX IF NOT EXISTS pilots_ts_airspace_idx      ON pilots(timestamp, airspace);
CREATE INDEX IF NOT EXISTS pilots_departure_ts_idx     ON pilots(departure, timestamp);
CREATE INDEX IF NOT EXISTS pilots_destination_ts_idx   ON pilots(destination, timestamp);
CREATE INDEX IF NOT EXISTS controllers_timestamp_idx   ON controllers(timestamp);

PRAGMA user_version = 1;
";
