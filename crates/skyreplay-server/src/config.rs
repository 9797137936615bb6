//! Runtime configuration, deserialised from a TOML file layered with
//! `SKYREPLAY_*` environment variables.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use skyreplay_geo::BoundarySource;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "defaults::host")]
  pub host:                  String,
  #[serde(default = "defaults::port")]
  pub port:                  u16,
  #[serde(default = "defaults::store_path")]
  pub store_path:            PathBuf,

  #[serde(default = "defaults::feed_url")]
  pub feed_url:              String,
  #[serde(default = "defaults::feed_timeout_secs")]
  pub feed_timeout_secs:     u64,
  /// How old the last good feed snapshot may be and still stand in for a
  /// failed fetch.
  #[serde(default = "defaults::feed_max_stale_secs")]
  pub feed_max_stale_secs:   u64,
  #[serde(default = "defaults::poll_interval_secs")]
  pub poll_interval_secs:    u64,

  /// Tried in order on every refresh; the first usable one wins.
  #[serde(default)]
  pub boundary_sources:      Vec<BoundarySource>,
  #[serde(default = "defaults::boundary_timeout_secs")]
  pub boundary_timeout_secs: u64,
  #[serde(default = "defaults::boundary_max_age_secs")]
  pub boundary_max_age_secs: u64,

  #[serde(default = "defaults::retention_secs")]
  pub retention_secs:        u64,
  /// Run a retention sweep every this many poll cycles. `0` disables
  /// pruning.
  #[serde(default = "defaults::prune_every")]
  pub prune_every:           u64,
}

impl ServerConfig {
  pub fn feed_timeout(&self) -> Duration { Duration::from_secs(self.feed_timeout_secs) }

  pub fn feed_max_stale(&self) -> Duration { Duration::from_secs(self.feed_max_stale_secs) }

  pub fn poll_interval(&self) -> Duration { Duration::from_secs(self.poll_interval_secs.max(1)) }

  pub fn boundary_timeout(&self) -> Duration { Duration::from_secs(self.boundary_timeout_secs) }

  pub fn boundary_max_age(&self) -> Duration { Duration::from_secs(self.boundary_max_age_secs) }

  pub fn retention(&self) -> Duration { Duration::from_secs(self.retention_secs) }
}

mod defaults {
  use std::path::PathBuf;

  pub fn host() -> String { "127.0.0.1".to_string() }
  pub fn port() -> u16 { 8080 }
  pub fn store_path() -> PathBuf { PathBuf::from("skyreplay.db") }
  pub fn feed_url() -> String { "https://data.vatsim.net/v3/vatsim-data.json".to_string() }
  pub fn feed_timeout_secs() -> u64 { 10 }
  pub fn feed_max_stale_secs() -> u64 { 120 }
  pub fn poll_interval_secs() -> u64 { 15 }
  pub fn boundary_timeout_secs() -> u64 { 20 }
  pub fn boundary_max_age_secs() -> u64 { 24 * 60 * 60 }
  pub fn retention_secs() -> u64 { 7 * 24 * 60 * 60 }
  pub fn prune_every() -> u64 { 240 }
}
