//! Handler for `GET /airspace`: a direct point lookup against the loaded
//! boundary set.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize};
use skyreplay_core::store::SampleStore;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct PointParams {
  pub lat: f64,
  pub lon: f64,
}

#[derive(Debug, Serialize)]
pub struct AirspaceMatch {
  pub lat:      f64,
  pub lon:      f64,
  /// `None` when the point lies in no loaded feature.
  pub airspace: Option<String>,
  /// Where the boundary set in use was loaded from.
  pub source:   Option<String>,
}

/// `GET /airspace?lat=…&lon=…`
pub async fn handler<S: SampleStore>(
  State(state): State<AppState<S>>,
  params: Result<Query<PointParams>, QueryRejection>,
) -> Result<Json<AirspaceMatch>, ApiError> {
  let Query(PointParams { lat, lon }) = params?;
  if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
    return Err(ApiError::BadRequest(format!("invalid lat: {lat}")));
  }
  if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
    return Err(ApiError::BadRequest(format!("invalid lon: {lon}")));
  }

  let set = state.boundaries.current();
  Ok(Json(AirspaceMatch {
    lat,
    lon,
    airspace: set.lookup(lat, lon).map(str::to_owned),
    source: set.source().map(str::to_owned),
  }))
}
