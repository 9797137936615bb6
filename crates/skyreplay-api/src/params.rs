//! Query-string shapes shared by several endpoints.

use serde::Deserialize;
use skyreplay_core::{
  Result,
  filter::SampleFilter,
  snapshot::check_range,
};

/// `?airspace=…&airport=…&alt_min=…&alt_max=…`, every field optional.
///
/// Values stay as raw strings so a malformed bound is reported by name
/// rather than as a generic deserialisation failure.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
  pub airspace: Option<String>,
  pub airport:  Option<String>,
  pub alt_min:  Option<String>,
  pub alt_max:  Option<String>,
}

impl FilterParams {
  pub fn to_filter(&self) -> Result<SampleFilter> {
    SampleFilter::from_raw(
      self.airspace.as_deref(),
      self.airport.as_deref(),
      self.alt_min.as_deref(),
      self.alt_max.as_deref(),
    )
  }
}

/// `?since=…&until=…`, inclusive epoch seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RangeParams {
  pub since: i64,
  pub until: i64,
}

impl RangeParams {
  /// Same ordering and span ceiling as snapshot requests.
  pub fn validate(&self) -> Result<()> {
    check_range(self.since, self.until).map(|_| ())
  }
}
