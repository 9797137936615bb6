//! Handler for `GET /filters/{column}`, the option lists behind the
//! playback UI's filter pickers.

use axum::{
  Json,
  extract::{Path, Query, State, rejection::QueryRejection},
};
use skyreplay_core::store::{Column, SampleStore, ValueCount};

use crate::{
  AppState,
  error::ApiError,
  params::{FilterParams, RangeParams},
};

/// `GET /filters/{column}?since=…&until=…` plus filter params. `column` is
/// one of `airspace`, `departure`, `destination`, `callsign`.
pub async fn handler<S: SampleStore>(
  State(state): State<AppState<S>>,
  Path(column): Path<String>,
  range: Result<Query<RangeParams>, QueryRejection>,
  filter: Result<Query<FilterParams>, QueryRejection>,
) -> Result<Json<Vec<ValueCount>>, ApiError> {
  let column: Column = column.parse()?;
  let Query(range) = range?;
  let Query(filter) = filter?;
  range.validate()?;
  let filter = filter.to_filter()?;

  let counts = state
    .store
    .aggregate_distinct(column, range.since, range.until, &filter)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(counts))
}
