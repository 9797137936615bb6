//! Handlers for raw sample reads.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/samples` | `?since&until` plus filter params |
//! | `GET`  | `/samples/at` | `?timestamp[&window]` plus filter params |
//! | `GET`  | `/timestamps` | `?since&until`; collected timestamps only |

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use skyreplay_core::{Error, sample::PilotSample, store::SampleStore};

use crate::{
  AppState,
  error::ApiError,
  params::{FilterParams, RangeParams},
};

// ─── Range ────────────────────────────────────────────────────────────────────

/// `GET /samples?since=…&until=…`
pub async fn range<S: SampleStore>(
  State(state): State<AppState<S>>,
  range: Result<Query<RangeParams>, QueryRejection>,
  filter: Result<Query<FilterParams>, QueryRejection>,
) -> Result<Json<Vec<PilotSample>>, ApiError> {
  let Query(range) = range?;
  let Query(filter) = filter?;
  range.validate()?;
  let filter = filter.to_filter()?;

  let samples = state
    .store
    .query_range(range.since, range.until, &filter)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(samples))
}

// ─── Point in time ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AtParams {
  pub timestamp: i64,
  /// Seconds either side of `timestamp`. Defaults to an exact match.
  #[serde(default)]
  pub window:    i64,
}

/// `GET /samples/at?timestamp=…[&window=…]`
pub async fn at<S: SampleStore>(
  State(state): State<AppState<S>>,
  params: Result<Query<AtParams>, QueryRejection>,
  filter: Result<Query<FilterParams>, QueryRejection>,
) -> Result<Json<Vec<PilotSample>>, ApiError> {
  let Query(params) = params?;
  let Query(filter) = filter?;
  if params.window < 0 {
    return Err(Error::NegativeWindow(params.window).into());
  }
  RangeParams {
    since: params.timestamp.saturating_sub(params.window),
    until: params.timestamp.saturating_add(params.window),
  }
  .validate()?;
  let filter = filter.to_filter()?;

  let samples = state
    .store
    .query_at(params.timestamp, params.window, &filter)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(samples))
}

// ─── Timestamps ───────────────────────────────────────────────────────────────

/// `GET /timestamps?since=…&until=…`
pub async fn timestamps<S: SampleStore>(
  State(state): State<AppState<S>>,
  range: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<Vec<i64>>, ApiError> {
  let Query(range) = range?;
  range.validate()?;

  let timestamps = state
    .store
    .distinct_timestamps(range.since, range.until)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(timestamps))
}
