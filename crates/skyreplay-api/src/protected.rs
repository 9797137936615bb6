//! Handlers for `/protected`: time ranges exempt from retention pruning.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/protected` | All ranges, oldest first |
//! | `POST` | `/protected` | Body: `{"start":…,"end":…,"label":…}`; returns 201 |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use skyreplay_core::store::{NewProtectedRange, ProtectedRange, SampleStore};

use crate::{AppState, error::ApiError};

/// `GET /protected`
pub async fn list<S: SampleStore>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<ProtectedRange>>, ApiError> {
  let ranges = state.store.protected_ranges().await.map_err(ApiError::store)?;
  Ok(Json(ranges))
}

/// `POST /protected`. Returns 201 + the stored range.
pub async fn create<S: SampleStore>(
  State(state): State<AppState<S>>,
  body: Result<Json<NewProtectedRange>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(range) = body?;
  range.validate()?;

  let stored = state
    .store
    .add_protected_range(range)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(range_id = stored.range_id, start = stored.start, end = stored.end, "protected range added");
  Ok((StatusCode::CREATED, Json(stored)))
}
