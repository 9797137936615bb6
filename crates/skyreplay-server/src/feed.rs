//! Client for the upstream network data feed.
//!
//! The feed is a single JSON document listing every connected pilot and
//! controller. Rows are validated here so nothing malformed reaches the
//! store; a bad row is skipped rather than failing the whole document.
//!
//! Concurrent [`FeedClient::fetch`] calls share one in-flight request. When
//! the upstream is unreachable the last good snapshot stands in for it, as
//! long as it is younger than the configured staleness ceiling.

use std::{
  sync::{Arc, Mutex, PoisonError},
  time::{Duration, Instant},
};

use serde::Deserialize;
use skyreplay_core::sample::{NewController, NewPilot, normalize_airport};
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum FeedError {
  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("feed returned status {0}")]
  Status(u16),

  #[error("malformed feed document: {0}")]
  Malformed(#[from] serde_json::Error),
}

// ─── Snapshot ─────────────────────────────────────────────────────────────────

/// Validated rows from one feed document.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
  pub pilots:      Vec<NewPilot>,
  pub controllers: Vec<NewController>,
  /// Rows dropped during validation.
  pub skipped:     usize,
}

/// Where the rows handed out by [`FeedClient::fetch`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
  Live,
  /// Upstream failed; this is the last good snapshot, `age` old.
  Cached { age: Duration },
  /// Upstream failed and nothing recent enough was cached.
  Empty,
}

#[derive(Debug, Clone)]
pub struct Fetched {
  pub snapshot: Arc<FeedSnapshot>,
  pub origin:   Origin,
}

impl Fetched {
  fn empty() -> Self {
    Self { snapshot: Arc::new(FeedSnapshot::default()), origin: Origin::Empty }
  }
}

// ─── Wire format ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawFeed {
  #[serde(default)]
  pilots:      Vec<serde_json::Value>,
  #[serde(default)]
  controllers: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawPilot {
  #[serde(default)]
  cid:         i64,
  callsign:    Option<String>,
  latitude:    Option<f64>,
  longitude:   Option<f64>,
  altitude:    Option<i32>,
  groundspeed: Option<i32>,
  heading:     Option<i32>,
  flight_plan: Option<RawFlightPlan>,
}

#[derive(Debug, Deserialize)]
struct RawFlightPlan {
  departure: Option<String>,
  arrival:   Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawController {
  #[serde(default)]
  cid:       i64,
  callsign:  Option<String>,
  frequency: Option<String>,
  facility:  Option<i32>,
  latitude:  Option<f64>,
  longitude: Option<f64>,
}

impl RawPilot {
  fn into_pilot(self) -> Option<NewPilot> {
    let mut pilot = NewPilot::new(
      self.callsign?.trim().to_ascii_uppercase(),
      self.cid,
      self.latitude?,
      self.longitude?,
    );
    pilot.altitude = self.altitude;
    pilot.groundspeed = self.groundspeed;
    pilot.heading = self.heading;
    if let Some(plan) = self.flight_plan {
      pilot.departure = plan.departure.as_deref().and_then(normalize_airport);
      pilot.destination = plan.arrival.as_deref().and_then(normalize_airport);
    }
    pilot.validate().ok().map(|()| pilot)
  }
}

impl RawController {
  fn into_controller(self) -> Option<NewController> {
    let mut controller = NewController::new(self.callsign?.trim().to_ascii_uppercase(), self.cid);
    controller.frequency = self.frequency.filter(|f| !f.trim().is_empty());
    controller.facility = self.facility;
    // Only keep a position when both halves are usable.
    if let (Some(lat), Some(lon)) = (self.latitude, self.longitude)
      && lat.is_finite()
      && lon.is_finite()
    {
      controller.latitude = Some(lat);
      controller.longitude = Some(lon);
    }
    controller.validate().ok().map(|()| controller)
  }
}

/// Parse and validate a feed document. Only a document that is not a JSON
/// object with the expected arrays is an error; individual bad rows are
/// counted in [`FeedSnapshot::skipped`].
pub fn parse_feed(text: &str) -> Result<FeedSnapshot, FeedError> {
  let raw: RawFeed = serde_json::from_str(text)?;
  let mut snapshot = FeedSnapshot::default();

  for value in raw.pilots {
    match serde_json::from_value::<RawPilot>(value).ok().and_then(RawPilot::into_pilot) {
      Some(pilot) => snapshot.pilots.push(pilot),
      None => snapshot.skipped += 1,
    }
  }
  for value in raw.controllers {
    match serde_json::from_value::<RawController>(value)
      .ok()
      .and_then(RawController::into_controller)
    {
      Some(controller) => snapshot.controllers.push(controller),
      None => snapshot.skipped += 1,
    }
  }

  if snapshot.skipped > 0 {
    tracing::debug!(skipped = snapshot.skipped, "skipped invalid feed rows");
  }
  Ok(snapshot)
}

// ─── Client ───────────────────────────────────────────────────────────────────

type InFlight = Mutex<Option<broadcast::Sender<Fetched>>>;

pub struct FeedClient {
  client:    reqwest::Client,
  url:       String,
  max_stale: Duration,
  last_good: Mutex<Option<(Instant, Arc<FeedSnapshot>)>>,
  in_flight: InFlight,
}

/// Clears the in-flight slot when the leading fetch finishes or is dropped,
/// so waiters never hang on an abandoned request.
struct InFlightGuard<'a>(&'a InFlight);

impl Drop for InFlightGuard<'_> {
  fn drop(&mut self) { self.0.lock().unwrap_or_else(PoisonError::into_inner).take(); }
}

impl FeedClient {
  pub fn new(url: impl Into<String>, timeout: Duration, max_stale: Duration) -> Result<Self, FeedError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("skyreplay/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self {
      client,
      url: url.into(),
      max_stale,
      last_good: Mutex::new(None),
      in_flight: Mutex::new(None),
    })
  }

  /// Fetch the current feed. Never fails: upstream errors are logged and
  /// answered from the last good snapshot or with an empty one.
  pub async fn fetch(&self) -> Fetched {
    let (tx, mut rx) = {
      let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
      match slot.as_ref() {
        Some(tx) => (None, Some(tx.subscribe())),
        None => {
          let (tx, _) = broadcast::channel(1);
          *slot = Some(tx.clone());
          (Some(tx), None)
        }
      }
    };

    if let Some(rx) = rx.as_mut() {
      return match rx.recv().await {
        Ok(fetched) => fetched,
        Err(_) => self.fallback(),
      };
    }

    let guard = InFlightGuard(&self.in_flight);
    let fetched = self.fetch_uncoalesced().await;
    drop(guard);
    if let Some(tx) = tx {
      // No receivers is fine: nobody else was waiting.
      let _ = tx.send(fetched.clone());
    }
    fetched
  }

  async fn fetch_uncoalesced(&self) -> Fetched {
    let started = Instant::now();
    match self.fetch_live().await {
      Ok(snapshot) => {
        tracing::debug!(
          pilots = snapshot.pilots.len(),
          controllers = snapshot.controllers.len(),
          elapsed = ?started.elapsed(),
          "fetched feed"
        );
        let snapshot = Arc::new(snapshot);
        *self.last_good.lock().unwrap_or_else(PoisonError::into_inner) =
          Some((Instant::now(), snapshot.clone()));
        Fetched { snapshot, origin: Origin::Live }
      }
      Err(e) => {
        let fetched = self.fallback();
        tracing::warn!(url = %self.url, error = %e, origin = ?fetched.origin, "feed fetch failed");
        fetched
      }
    }
  }

  async fn fetch_live(&self) -> Result<FeedSnapshot, FeedError> {
    let resp = self.client.get(&self.url).send().await?;
    if !resp.status().is_success() {
      return Err(FeedError::Status(resp.status().as_u16()));
    }
    let text = resp.text().await?;
    parse_feed(&text)
  }

  fn fallback(&self) -> Fetched {
    let last = self.last_good.lock().unwrap_or_else(PoisonError::into_inner);
    match last.as_ref() {
      Some((at, snapshot)) if at.elapsed() <= self.max_stale => Fetched {
        snapshot: snapshot.clone(),
        origin:   Origin::Cached { age: at.elapsed() },
      },
      _ => Fetched::empty(),
    }
  }
}
