//! Snapshot resolver. Maps an evenly spaced playback grid onto the
//! timestamps the poller actually produced.
//!
//! Resolution runs in three phases:
//!
//! 1. enumerate bucket timestamps on the `step` grid and match each one to the
//!    nearest collected timestamp (a single merge pass over two sorted
//!    sequences);
//! 2. fetch rows once per distinct source timestamp, applying the filter in
//!    the store;
//! 3. hand every bucket the rows of the source it mapped to.
//!
//! Cost is proportional to the distinct source timestamps touched, not to the
//! number of buckets requested.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  Error, Result,
  filter::SampleFilter,
  sample::{ControllerSample, PilotSample},
  store::SampleStore,
};

/// Longest request range accepted, in seconds.
pub const MAX_SPAN_SECS: i64 = 24 * 60 * 60;

/// Most buckets a single request may produce.
pub const MAX_BUCKETS: i64 = 10_000;

/// Check that `[since, until]` is ordered and within [`MAX_SPAN_SECS`];
/// returns the span. A span too wide for `i64` is reported as `i64::MAX`.
pub fn check_range(since: i64, until: i64) -> Result<i64> {
  if until < since {
    return Err(Error::RangeOutOfOrder { since, until });
  }
  let span = until.checked_sub(since).unwrap_or(i64::MAX);
  if span > MAX_SPAN_SECS {
    return Err(Error::SpanTooLarge { span, max: MAX_SPAN_SECS });
  }
  Ok(span)
}

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRequest {
  /// First bucket, epoch seconds.
  pub since:          i64,
  /// Last bucket is the final grid point at or before this.
  pub until:          i64,
  /// Grid spacing in seconds.
  pub step:           i64,
  /// Padding applied to both ends when looking up collected timestamps.
  pub window:         i64,
  /// Largest accepted distance between a bucket and its source.
  pub max_source_age: i64,
}

impl SnapshotRequest {
  /// Reject degenerate requests before any work is done.
  pub fn validate(&self) -> Result<()> {
    check_range(self.since, self.until)?;
    if self.step <= 0 {
      return Err(Error::NonPositiveStep(self.step));
    }
    if self.window < 0 {
      return Err(Error::NegativeWindow(self.window));
    }
    if self.max_source_age < 0 {
      return Err(Error::NegativeSourceAge(self.max_source_age));
    }
    let count = self.bucket_count();
    if count > MAX_BUCKETS {
      return Err(Error::TooManyBuckets { count, max: MAX_BUCKETS });
    }
    Ok(())
  }

  /// Number of grid points in `[since, until]`. Only meaningful once the
  /// request has a positive step and an ordered range.
  pub fn bucket_count(&self) -> i64 {
    let span = self.until.checked_sub(self.since).unwrap_or(i64::MAX);
    (span / self.step).saturating_add(1)
  }

  /// `since, since + step, …` up to the last value not after `until`.
  pub fn buckets(&self) -> impl Iterator<Item = i64> + use<> {
    let Self { since, step, .. } = *self;
    let count = if self.step > 0 && self.until >= self.since { self.bucket_count() } else { 0 };
    (0..count).map(move |i| since + i * step)
  }
}

// ─── Matching ────────────────────────────────────────────────────────────────

/// For each bucket, the nearest timestamp in `available` if it lies within
/// `max_source_age`.
///
/// Both slices must be sorted ascending. A single pointer advances through
/// `available`, so the whole pass is O(buckets + available). When two
/// candidates are equally distant the later one wins.
pub fn nearest_sources(buckets: &[i64], available: &[i64], max_source_age: i64) -> Vec<Option<i64>> {
  let mut next = 0;
  buckets
    .iter()
    .map(|&bucket| {
      // `next` is the first candidate at or after the bucket.
      while next < available.len() && available[next] < bucket {
        next += 1;
      }
      let before = next.checked_sub(1).map(|i| available[i]);
      let after = available.get(next).copied();

      let nearest = match (before, after) {
        (Some(b), Some(a)) => {
          if a.abs_diff(bucket) <= bucket.abs_diff(b) { a } else { b }
        }
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => return None,
      };

      (nearest.abs_diff(bucket) <= max_source_age.unsigned_abs()).then_some(nearest)
    })
    .collect()
}

// ─── Result ──────────────────────────────────────────────────────────────────

/// One playback frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
  /// The collected timestamp that backs this frame; `None` when nothing was
  /// within the staleness bound.
  pub source_timestamp: Option<i64>,
  pub pilots:           Vec<PilotSample>,
  pub controllers:      Vec<ControllerSample>,
}

impl Frame {
  fn empty() -> Self {
    Self { source_timestamp: None, pilots: Vec::new(), controllers: Vec::new() }
  }

  pub fn is_empty(&self) -> bool { self.pilots.is_empty() && self.controllers.is_empty() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  pub request: SnapshotRequest,
  /// Keyed by bucket timestamp; every bucket of the grid is present.
  pub frames:  BTreeMap<i64, Frame>,
}

#[derive(Debug, Error)]
pub enum ResolveError<E: std::error::Error + 'static> {
  #[error(transparent)]
  Invalid(#[from] Error),

  #[error("store error: {0}")]
  Store(#[source] E),
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Build a bucketed snapshot of `request` from `store`.
pub async fn resolve<S: SampleStore>(
  store: &S,
  request: &SnapshotRequest,
  filter: &SampleFilter,
) -> Result<Snapshot, ResolveError<S::Error>> {
  request.validate()?;

  let buckets: Vec<i64> = request.buckets().collect();
  let available = store
    .distinct_timestamps(
      request.since.saturating_sub(request.window),
      request.until.saturating_add(request.window),
    )
    .await
    .map_err(ResolveError::Store)?;

  let matches = nearest_sources(&buckets, &available, request.max_source_age);
  let sources: Vec<i64> = matches
    .iter()
    .flatten()
    .copied()
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect();

  let mut pilots: BTreeMap<i64, Vec<PilotSample>> = BTreeMap::new();
  let mut controllers: BTreeMap<i64, Vec<ControllerSample>> = BTreeMap::new();

  if !sources.is_empty() {
    for sample in store.query_timestamps(&sources, filter).await.map_err(ResolveError::Store)? {
      pilots.entry(sample.timestamp).or_default().push(sample);
    }
    for sample in store
      .controllers_at_timestamps(&sources)
      .await
      .map_err(ResolveError::Store)?
    {
      controllers.entry(sample.timestamp).or_default().push(sample);
    }
  }

  let frames = buckets
    .into_iter()
    .zip(matches)
    .map(|(bucket, source)| {
      let frame = match source {
        Some(ts) => Frame {
          source_timestamp: Some(ts),
          pilots:           pilots.get(&ts).cloned().unwrap_or_default(),
          controllers:      controllers.get(&ts).cloned().unwrap_or_default(),
        },
        None => Frame::empty(),
      };
      (bucket, frame)
    })
    .collect();

  Ok(Snapshot { request: *request, frames })
}
