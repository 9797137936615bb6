//! The `SampleStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `skyreplay-store-sqlite`).
//! The snapshot resolver, the ingest poller and the HTTP layer depend on this
//! abstraction, not on any concrete backend.

use std::{fmt, future::Future, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  filter::SampleFilter,
  sample::{Batch, ControllerSample, PilotSample},
};

// ─── Aggregation ─────────────────────────────────────────────────────────────

/// Pilot columns that can be aggregated into filter-option lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
  Airspace,
  Departure,
  Destination,
  Callsign,
}

impl Column {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Airspace => "airspace",
      Self::Departure => "departure",
      Self::Destination => "destination",
      Self::Callsign => "callsign",
    }
  }
}

impl fmt::Display for Column {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Column {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "airspace" => Ok(Self::Airspace),
      "departure" => Ok(Self::Departure),
      "destination" => Ok(Self::Destination),
      "callsign" => Ok(Self::Callsign),
      _ => Err(Error::UnknownColumn(s.to_owned())),
    }
  }
}

/// One entry of an [`SampleStore::aggregate_distinct`] result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
  pub value: String,
  pub count: u64,
}

// ─── Protected ranges ────────────────────────────────────────────────────────

/// A time interval exempt from retention pruning regardless of age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedRange {
  pub range_id:   i64,
  /// Inclusive lower bound, epoch seconds.
  pub start:      i64,
  /// Inclusive upper bound, epoch seconds.
  pub end:        i64,
  /// Free-text reason, e.g. the name of a preserved event.
  pub label:      Option<String>,
  pub created_at: DateTime<Utc>,
}

impl ProtectedRange {
  pub fn contains(&self, timestamp: i64) -> bool {
    self.start <= timestamp && timestamp <= self.end
  }
}

/// Input to [`SampleStore::add_protected_range`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProtectedRange {
  pub start: i64,
  pub end:   i64,
  #[serde(default)]
  pub label: Option<String>,
}

impl NewProtectedRange {
  pub fn validate(&self) -> Result<()> {
    if self.end < self.start {
      return Err(Error::RangeOutOfOrder { since: self.start, until: self.end });
    }
    Ok(())
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an append-only time-series store of pilot and controller
/// samples.
///
/// Every pilot read accepts the same [`SampleFilter`]. Samples are never
/// updated; they leave the store only through [`SampleStore::prune`].
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SampleStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Append every row of `batch` under `batch.timestamp` in one transaction.
  /// Either all rows become visible or none do. Returns the number of rows
  /// written.
  fn insert_batch(
    &self,
    batch: Batch,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Delete samples strictly older than `cutoff`, except those whose
  /// timestamp lies inside a protected range. Returns the number of rows
  /// deleted.
  fn prune(
    &self,
    cutoff: i64,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Pilot reads ───────────────────────────────────────────────────────

  /// Pilot samples with `since <= timestamp <= until`, ascending by
  /// timestamp.
  fn query_range<'a>(
    &'a self,
    since: i64,
    until: i64,
    filter: &'a SampleFilter,
  ) -> impl Future<Output = Result<Vec<PilotSample>, Self::Error>> + Send + 'a;

  /// Pilot samples within `[timestamp - window, timestamp + window]`.
  fn query_at<'a>(
    &'a self,
    timestamp: i64,
    window: i64,
    filter: &'a SampleFilter,
  ) -> impl Future<Output = Result<Vec<PilotSample>, Self::Error>> + Send + 'a
  {
    self.query_range(timestamp.saturating_sub(window), timestamp.saturating_add(window), filter)
  }

  /// Pilot samples whose timestamp is exactly one of `timestamps`, ascending.
  fn query_timestamps<'a>(
    &'a self,
    timestamps: &'a [i64],
    filter: &'a SampleFilter,
  ) -> impl Future<Output = Result<Vec<PilotSample>, Self::Error>> + Send + 'a;

  /// Sorted unique timestamps present in `[since, until]` across pilot and
  /// controller rows, i.e. the index of what was actually collected.
  fn distinct_timestamps(
    &self,
    since: i64,
    until: i64,
  ) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + '_;

  /// Count distinct non-null values of `column` over the filtered range,
  /// ordered by count descending then value ascending.
  fn aggregate_distinct<'a>(
    &'a self,
    column: Column,
    since: i64,
    until: i64,
    filter: &'a SampleFilter,
  ) -> impl Future<Output = Result<Vec<ValueCount>, Self::Error>> + Send + 'a;

  // ── Controller reads ──────────────────────────────────────────────────

  fn controllers_range(
    &self,
    since: i64,
    until: i64,
  ) -> impl Future<Output = Result<Vec<ControllerSample>, Self::Error>> + Send + '_;

  fn controllers_at_timestamps<'a>(
    &'a self,
    timestamps: &'a [i64],
  ) -> impl Future<Output = Result<Vec<ControllerSample>, Self::Error>> + Send + 'a;

  // ── Protected ranges ──────────────────────────────────────────────────

  fn add_protected_range(
    &self,
    range: NewProtectedRange,
  ) -> impl Future<Output = Result<ProtectedRange, Self::Error>> + Send + '_;

  fn protected_ranges(
    &self,
  ) -> impl Future<Output = Result<Vec<ProtectedRange>, Self::Error>> + Send + '_;
}
