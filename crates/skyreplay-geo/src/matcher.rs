//! Point-in-polygon matching against a loaded feature set.

use std::time::{Duration, Instant};

use crate::feature::BoundaryFeature;

/// An immutable, ordered set of boundary features.
///
/// Where features overlap, the one loaded first wins. That is a known
/// limitation of the boundary data rather than something resolved here by
/// area or priority.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
  features:  Vec<BoundaryFeature>,
  source:    Option<String>,
  loaded_at: Option<Instant>,
}

impl FeatureSet {
  /// The set used before the first successful load.
  pub fn empty() -> Self { Self::default() }

  pub fn new(features: Vec<BoundaryFeature>, source: impl Into<String>) -> Self {
    Self {
      features,
      source: Some(source.into()),
      loaded_at: Some(Instant::now()),
    }
  }

  /// Label of the first feature containing the point. Non-finite input
  /// yields `None`.
  pub fn lookup(&self, lat: f64, lon: f64) -> Option<&str> {
    if !lat.is_finite() || !lon.is_finite() {
      return None;
    }
    self
      .features
      .iter()
      .find(|f| f.contains(lon, lat))
      .map(|f| f.label.as_str())
  }

  pub fn features(&self) -> &[BoundaryFeature] { &self.features }

  pub fn len(&self) -> usize { self.features.len() }

  pub fn is_empty(&self) -> bool { self.features.is_empty() }

  /// Where this set was loaded from, if it was loaded at all.
  pub fn source(&self) -> Option<&str> { self.source.as_deref() }

  /// Time since load; `None` for the initial empty set.
  pub fn age(&self) -> Option<Duration> { self.loaded_at.map(|t| t.elapsed()) }
}
