//! JSON REST API for skyreplay.
//!
//! Exposes an axum [`Router`] backed by any [`SampleStore`] and a
//! [`BoundaryCache`]. Transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", skyreplay_api::api_router(state.clone()))
//! ```
//!
//! Every rejected request answers `400` with `{"error": "..."}` naming the
//! offending parameter.

pub mod airspace;
pub mod controllers;
pub mod error;
pub mod filters;
pub mod params;
pub mod protected;
pub mod samples;
pub mod snapshots;

use std::sync::Arc;

use axum::{Router, routing::get};
use skyreplay_core::store::SampleStore;
use skyreplay_geo::BoundaryCache;

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:      Arc<S>,
  pub boundaries: Arc<BoundaryCache>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      boundaries: self.boundaries.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: SampleStore + 'static,
{
  Router::new()
    // Playback
    .route("/snapshots", get(snapshots::handler::<S>))
    // Raw reads
    .route("/samples", get(samples::range::<S>))
    .route("/samples/at", get(samples::at::<S>))
    .route("/timestamps", get(samples::timestamps::<S>))
    .route("/filters/{column}", get(filters::handler::<S>))
    .route("/controllers", get(controllers::handler::<S>))
    // Boundaries
    .route("/airspace", get(airspace::handler::<S>))
    // Retention
    .route("/protected", get(protected::list::<S>).post(protected::create::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::Value;
  use skyreplay_core::sample::{Batch, NewController, NewPilot};
  use skyreplay_geo::{FeatureSet, feature::parse_feature_collection};
  use skyreplay_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  const BOUNDARIES: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","id":"EGTT",
     "geometry":{"type":"Polygon","coordinates":[[[-6,49],[2,49],[2,55],[-6,55],[-6,49]]]}}
  ]}"#;

  fn pilot(callsign: &str, airspace: &str, dep: &str, dest: &str, alt: i32) -> NewPilot {
    let mut p = NewPilot::new(callsign, 1, 51.5, -0.4);
    p.airspace = Some(airspace.into());
    p.departure = Some(dep.into());
    p.destination = Some(dest.into());
    p.altitude = Some(alt);
    p
  }

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for ts in [100, 115, 130, 145] {
      let mut batch = Batch::new(ts);
      batch.pilots.push(pilot("BAW1", "EGTT", "EGLL", "KJFK", 35_000));
      batch.pilots.push(pilot("AFR2", "LFFF", "LFPG", "EGLL", 8_000));
      batch.controllers.push(NewController::new("LON_S_CTR", 7));
      batch.controllers.push(NewController::new("EGLL_ATIS", 8));
      store.insert_batch(batch).await.unwrap();
    }

    let features = parse_feature_collection(BOUNDARIES).unwrap();
    let boundaries = BoundaryCache::with_features(FeatureSet::new(features, "inline")).unwrap();

    AppState {
      store:      Arc::new(store),
      boundaries: Arc::new(boundaries),
    }
  }

  async fn send(state: AppState<SqliteStore>, req: Request<Body>) -> (StatusCode, Value) {
    let resp = api_router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
  }

  async fn get_json(state: AppState<SqliteStore>, uri: &str) -> (StatusCode, Value) {
    send(state, Request::get(uri).body(Body::empty()).unwrap()).await
  }

  async fn post_json(state: AppState<SqliteStore>, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::post(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();
    send(state, req).await
  }

  fn error_text(body: &Value) -> &str { body["error"].as_str().unwrap() }

  // ── Snapshots ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn snapshot_fills_every_grid_bucket() {
    let state = make_state().await;
    let (status, body) = get_json(
      state,
      "/snapshots?since=100&until=145&step=15&window=10&max_source_age=8",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let frames = body["frames"].as_object().unwrap();
    assert_eq!(frames.len(), 4);
    for bucket in ["100", "115", "130", "145"] {
      let frame = &frames[bucket];
      assert_eq!(frame["source_timestamp"].to_string(), bucket);
      assert_eq!(frame["pilots"].as_array().unwrap().len(), 2);
      assert_eq!(frame["controllers"].as_array().unwrap().len(), 2);
    }
  }

  #[tokio::test]
  async fn snapshot_bucket_without_source_is_empty() {
    let state = make_state().await;
    let (status, body) =
      get_json(state, "/snapshots?since=107&until=107&step=15&window=10&max_source_age=0").await;

    assert_eq!(status, StatusCode::OK);
    let frame = &body["frames"]["107"];
    assert!(frame["source_timestamp"].is_null());
    assert!(frame["pilots"].as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn snapshot_filters_apply_to_frames() {
    let state = make_state().await;
    let (status, body) = get_json(
      state,
      "/snapshots?since=100&until=100&max_source_age=0&airspace=egtt&alt_min=30000",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let pilots = body["frames"]["100"]["pilots"].as_array().unwrap();
    assert_eq!(pilots.len(), 1);
    assert_eq!(pilots[0]["callsign"], "BAW1");
  }

  #[tokio::test]
  async fn invalid_snapshot_requests_are_rejected() {
    let cases = [
      ("/snapshots?since=100&until=200&step=0", "step"),
      ("/snapshots?since=200&until=100", "until"),
      ("/snapshots?since=0&until=172800", "exceeds"),
      ("/snapshots?since=0&until=86400&step=1", "buckets"),
      ("/snapshots?since=0&until=10&window=-1", "window"),
      ("/snapshots?since=0&until=10&alt_min=high", "alt_min"),
      ("/snapshots?since=0&until=10&alt_min=5000&alt_max=1000", "altitude"),
    ];
    for (uri, needle) in cases {
      let (status, body) = get_json(make_state().await, uri).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
      assert!(error_text(&body).contains(needle), "{uri}: {body}");
    }
  }

  #[tokio::test]
  async fn full_i64_range_is_rejected_everywhere() {
    let range = "since=-9223372036854775808&until=9223372036854775807";
    for path in ["/snapshots", "/samples", "/timestamps", "/filters/airspace", "/controllers"] {
      let uri = format!("{path}?{range}");
      let (status, body) = get_json(make_state().await, &uri).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
      assert!(error_text(&body).contains("exceeds"), "{uri}: {body}");
    }
  }

  #[tokio::test]
  async fn missing_parameters_are_a_json_bad_request() {
    let (status, body) = get_json(make_state().await, "/snapshots?until=100").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_text(&body).contains("since"), "{body}");
  }

  // ── Samples ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn samples_range_with_airport_filter() {
    let state = make_state().await;
    let (status, body) = get_json(state, "/samples?since=100&until=115&airport=LFPG").await;

    assert_eq!(status, StatusCode::OK);
    let samples = body.as_array().unwrap();
    assert_eq!(samples.len(), 2);
    assert!(samples.iter().all(|s| s["callsign"] == "AFR2"));
    assert_eq!(samples[0]["timestamp"], 100);
    assert_eq!(samples[1]["timestamp"], 115);
  }

  #[tokio::test]
  async fn samples_at_uses_the_window() {
    let state = make_state().await;
    let (_, exact) = get_json(state.clone(), "/samples/at?timestamp=110").await;
    assert!(exact.as_array().unwrap().is_empty());

    let (status, near) = get_json(state, "/samples/at?timestamp=110&window=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(near.as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn timestamps_lists_collected_points() {
    let (status, body) = get_json(make_state().await, "/timestamps?since=0&until=130").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([100, 115, 130]));
  }

  #[tokio::test]
  async fn filter_options_are_counted() {
    let state = make_state().await;
    let (status, body) = get_json(state.clone(), "/filters/destination?since=0&until=200").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      body,
      serde_json::json!([{ "value": "EGLL", "count": 4 }, { "value": "KJFK", "count": 4 }])
    );

    let (status, body) = get_json(state, "/filters/altitude?since=0&until=200").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_text(&body).contains("altitude"));
  }

  // ── Controllers ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn controllers_are_classified() {
    let state = make_state().await;
    let (status, body) = get_json(state.clone(), "/controllers?since=100&until=100").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    let ctr = rows.iter().find(|r| r["callsign"] == "LON_S_CTR").unwrap();
    assert_eq!(ctr["position"]["sector"], "LON");
    assert_eq!(ctr["position"]["role"], "center");
    assert_eq!(ctr["controlling"], true);

    let (_, body) = get_json(state, "/controllers?since=100&until=100&controlling=true").await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["callsign"], "LON_S_CTR");
  }

  // ── Airspace ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn airspace_lookup() {
    let state = make_state().await;
    let (status, body) = get_json(state.clone(), "/airspace?lat=53&lon=-3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["airspace"], "EGTT");
    assert_eq!(body["source"], "inline");

    let (_, body) = get_json(state.clone(), "/airspace?lat=-33.9&lon=151.2").await;
    assert!(body["airspace"].is_null());

    let (status, _) = get_json(state, "/airspace?lat=91&lon=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Protected ranges ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn protected_ranges_roundtrip() {
    let state = make_state().await;
    let (status, created) = post_json(
      state.clone(),
      "/protected",
      serde_json::json!({ "start": 100, "end": 130, "label": "cross the pond" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["label"], "cross the pond");

    let (status, list) = get_json(state, "/protected").await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["range_id"], created["range_id"]);
  }

  #[tokio::test]
  async fn reversed_protected_range_is_rejected() {
    let (status, body) = post_json(
      make_state().await,
      "/protected",
      serde_json::json!({ "start": 200, "end": 100 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_text(&body).contains("before"));
  }
}
