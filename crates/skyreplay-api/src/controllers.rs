//! Handler for `GET /controllers`.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize};
use skyreplay_core::{
  controller::{Position, classify},
  sample::ControllerSample,
  store::SampleStore,
};

use crate::{AppState, error::ApiError, params::RangeParams};

/// A stored controller sample with its callsign classified.
#[derive(Debug, Serialize)]
pub struct ControllerView {
  #[serde(flatten)]
  pub sample:      ControllerSample,
  pub position:    Position,
  /// `false` for ATIS, observers and unrecognised suffixes.
  pub controlling: bool,
}

impl From<ControllerSample> for ControllerView {
  fn from(sample: ControllerSample) -> Self {
    let position = classify(&sample.callsign);
    let controlling = position.role.is_controlling();
    Self { sample, position, controlling }
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct ControllingParam {
  /// Drop ATIS, observers and unrecognised positions.
  #[serde(default)]
  pub controlling: bool,
}

/// `GET /controllers?since=…&until=…[&controlling=true]`
pub async fn handler<S: SampleStore>(
  State(state): State<AppState<S>>,
  range: Result<Query<RangeParams>, QueryRejection>,
  only: Result<Query<ControllingParam>, QueryRejection>,
) -> Result<Json<Vec<ControllerView>>, ApiError> {
  let Query(range) = range?;
  let Query(only) = only?;
  range.validate()?;

  let views = state
    .store
    .controllers_range(range.since, range.until)
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(ControllerView::from)
    .filter(|v| !only.controlling || v.controlling)
    .collect();
  Ok(Json(views))
}
