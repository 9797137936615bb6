//! Handler for `GET /snapshots`.
//!
//! `since` and `until` are required; `step`, `window` and `max_source_age`
//! fall back to the defaults below. Filter parameters as in
//! [`FilterParams`].

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use skyreplay_core::{
  snapshot::{Snapshot, SnapshotRequest, resolve},
  store::SampleStore,
};

use crate::{AppState, error::ApiError, params::FilterParams};

pub const DEFAULT_STEP: i64 = 15;
pub const DEFAULT_WINDOW: i64 = 60;
pub const DEFAULT_MAX_SOURCE_AGE: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct SnapshotParams {
  pub since:          i64,
  pub until:          i64,
  pub step:           Option<i64>,
  pub window:         Option<i64>,
  pub max_source_age: Option<i64>,
}

impl From<SnapshotParams> for SnapshotRequest {
  fn from(p: SnapshotParams) -> Self {
    SnapshotRequest {
      since:          p.since,
      until:          p.until,
      step:           p.step.unwrap_or(DEFAULT_STEP),
      window:         p.window.unwrap_or(DEFAULT_WINDOW),
      max_source_age: p.max_source_age.unwrap_or(DEFAULT_MAX_SOURCE_AGE),
    }
  }
}

/// `GET /snapshots?since=…&until=…[&step=…][&window=…][&max_source_age=…]`
pub async fn handler<S: SampleStore>(
  State(state): State<AppState<S>>,
  params: Result<Query<SnapshotParams>, QueryRejection>,
  filter: Result<Query<FilterParams>, QueryRejection>,
) -> Result<Json<Snapshot>, ApiError> {
  let Query(params) = params?;
  let Query(filter) = filter?;
  let filter = filter.to_filter()?;
  let request = SnapshotRequest::from(params);

  let snapshot = resolve(state.store.as_ref(), &request, &filter).await?;
  tracing::debug!(
    buckets = snapshot.frames.len(),
    since = request.since,
    until = request.until,
    "resolved snapshot"
  );
  Ok(Json(snapshot))
}
