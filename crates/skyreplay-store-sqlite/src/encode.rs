//! Encoding and decoding helpers between domain types and SQLite rows.
//!
//! Timestamps of samples are stored as integer epoch seconds; bookkeeping
//! timestamps (`created_at`) as RFC 3339 strings.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use skyreplay_core::{
  sample::{ControllerSample, PilotSample},
  store::ProtectedRange,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Samples ─────────────────────────────────────────────────────────────────

/// Column list matching [`pilot_from_row`].
pub const PILOT_COLUMNS: &str = "timestamp, callsign, subject_id, latitude, longitude, \
   altitude, groundspeed, heading, airspace, departure, destination";

pub fn pilot_from_row(row: &Row<'_>) -> rusqlite::Result<PilotSample> {
  Ok(PilotSample {
    timestamp:   row.get(0)?,
    callsign:    row.get(1)?,
    subject_id:  row.get(2)?,
    latitude:    row.get(3)?,
    longitude:   row.get(4)?,
    altitude:    row.get(5)?,
    groundspeed: row.get(6)?,
    heading:     row.get(7)?,
    airspace:    row.get(8)?,
    departure:   row.get(9)?,
    destination: row.get(10)?,
  })
}

/// Column list matching [`controller_from_row`].
pub const CONTROLLER_COLUMNS: &str =
  "timestamp, callsign, subject_id, frequency, facility, latitude, longitude";

pub fn controller_from_row(row: &Row<'_>) -> rusqlite::Result<ControllerSample> {
  Ok(ControllerSample {
    timestamp:  row.get(0)?,
    callsign:   row.get(1)?,
    subject_id: row.get(2)?,
    frequency:  row.get(3)?,
    facility:   row.get(4)?,
    latitude:   row.get(5)?,
    longitude:  row.get(6)?,
  })
}

// ─── Protected ranges ────────────────────────────────────────────────────────

/// Raw values read directly from a `protected_ranges` row.
pub struct RawProtectedRange {
  pub range_id:   i64,
  pub start_ts:   i64,
  pub end_ts:     i64,
  pub label:      Option<String>,
  pub created_at: String,
}

impl RawProtectedRange {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      range_id:   row.get(0)?,
      start_ts:   row.get(1)?,
      end_ts:     row.get(2)?,
      label:      row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_range(self) -> Result<ProtectedRange> {
    Ok(ProtectedRange {
      range_id:   self.range_id,
      start:      self.start_ts,
      end:        self.end_ts,
      label:      self.label,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
