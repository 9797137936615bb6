//! Filter composer shared by every query path.
//!
//! A [`SampleFilter`] is the triple (airspace set, airport set, altitude
//! range). Categories combine with AND; values inside a category combine with
//! OR. An empty category never restricts anything.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, sample::PilotSample};

// ─── Raw input parsing ───────────────────────────────────────────────────────

/// Split a comma- and/or whitespace-separated list into a deduplicated set of
/// upper-cased tokens. `None` and blank input yield an empty set.
pub fn parse_tokens(raw: Option<&str>) -> BTreeSet<String> {
  raw
    .unwrap_or_default()
    .split(|c: char| c == ',' || c.is_whitespace())
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_ascii_uppercase)
    .collect()
}

/// Parse an optional numeric bound. Absent or blank means "no bound".
pub fn parse_bound(name: &'static str, raw: Option<&str>) -> Result<Option<i32>> {
  match raw.map(str::trim) {
    None | Some("") => Ok(None),
    Some(s) => s.parse::<i32>().map(Some).map_err(|_| Error::InvalidFilter {
      name,
      value: s.to_owned(),
    }),
  }
}

// ─── Altitude ────────────────────────────────────────────────────────────────

/// Inclusive altitude bounds in feet. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltitudeRange {
  pub min: Option<i32>,
  pub max: Option<i32>,
}

impl AltitudeRange {
  pub fn is_active(&self) -> bool { self.min.is_some() || self.max.is_some() }

  /// A missing altitude fails any active range.
  pub fn contains(&self, altitude: Option<i32>) -> bool {
    if !self.is_active() {
      return true;
    }
    let Some(alt) = altitude else {
      return false;
    };
    self.min.is_none_or(|min| alt >= min) && self.max.is_none_or(|max| alt <= max)
  }
}

// ─── Compound filter ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFilter {
  /// Accept samples whose airspace label is one of these.
  pub airspaces: BTreeSet<String>,
  /// Accept samples departing from or destined to one of these.
  pub airports:  BTreeSet<String>,
  pub altitude:  AltitudeRange,
}

impl SampleFilter {
  /// The filter that accepts everything.
  pub fn none() -> Self { Self::default() }

  /// Build a filter from raw request strings.
  pub fn from_raw(
    airspace: Option<&str>,
    airport: Option<&str>,
    alt_min: Option<&str>,
    alt_max: Option<&str>,
  ) -> Result<Self> {
    let altitude = AltitudeRange {
      min: parse_bound("alt_min", alt_min)?,
      max: parse_bound("alt_max", alt_max)?,
    };
    if let (Some(min), Some(max)) = (altitude.min, altitude.max)
      && min > max
    {
      return Err(Error::InvalidFilter {
        name:  "altitude",
        value: format!("{min}..{max}"),
      });
    }
    Ok(Self {
      airspaces: parse_tokens(airspace),
      airports: parse_tokens(airport),
      altitude,
    })
  }

  pub fn with_airspaces<I, T>(mut self, airspaces: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
  {
    self.airspaces = airspaces
      .into_iter()
      .map(|a| a.as_ref().trim().to_ascii_uppercase())
      .filter(|a| !a.is_empty())
      .collect();
    self
  }

  pub fn with_airports<I, T>(mut self, airports: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
  {
    self.airports = airports
      .into_iter()
      .map(|a| a.as_ref().trim().to_ascii_uppercase())
      .filter(|a| !a.is_empty())
      .collect();
    self
  }

  pub fn with_altitude(mut self, min: Option<i32>, max: Option<i32>) -> Self {
    self.altitude = AltitudeRange { min, max };
    self
  }

  pub fn is_empty(&self) -> bool {
    self.airspaces.is_empty() && self.airports.is_empty() && !self.altitude.is_active()
  }

  /// In-memory form of the predicate the store evaluates in SQL.
  pub fn matches(&self, sample: &PilotSample) -> bool {
    let airspace_ok = self.airspaces.is_empty()
      || sample
        .airspace
        .as_deref()
        .is_some_and(|a| self.airspaces.contains(a));

    let airport_ok = self.airports.is_empty()
      || [sample.departure.as_deref(), sample.destination.as_deref()]
        .into_iter()
        .flatten()
        .any(|code| self.airports.contains(code));

    airspace_ok && airport_ok && self.altitude.contains(sample.altitude)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sample::NewPilot;

  fn sample(airspace: Option<&str>, dep: Option<&str>, dest: Option<&str>, alt: Option<i32>) -> PilotSample {
    let mut p = NewPilot::new("TEST1", 1, 0.0, 0.0);
    p.airspace = airspace.map(Into::into);
    p.departure = dep.map(Into::into);
    p.destination = dest.map(Into::into);
    p.altitude = alt;
    p.at(100)
  }

  #[test]
  fn tokens_are_split_trimmed_uppercased_and_deduplicated() {
    let set = parse_tokens(Some(" eggx, EGTT  egtt,,\tlfff "));
    let got: Vec<_> = set.into_iter().collect();
    assert_eq!(got, vec!["EGGX", "EGTT", "LFFF"]);
  }

  #[test]
  fn blank_input_means_no_restriction() {
    assert!(parse_tokens(None).is_empty());
    assert!(parse_tokens(Some("  , ")).is_empty());
    let filter = SampleFilter::from_raw(Some(""), None, Some(" "), None).unwrap();
    assert!(filter.is_empty());
    assert!(filter.matches(&sample(None, None, None, None)));
  }

  #[test]
  fn bad_bounds_are_rejected_with_the_value() {
    let err = SampleFilter::from_raw(None, None, Some("high"), None).unwrap_err();
    assert_eq!(err, Error::InvalidFilter { name: "alt_min", value: "high".into() });

    let err = SampleFilter::from_raw(None, None, Some("300"), Some("200")).unwrap_err();
    assert!(matches!(err, Error::InvalidFilter { name: "altitude", .. }));
  }

  #[test]
  fn airspace_category_is_or_within() {
    let f = SampleFilter::none().with_airspaces(["eggx", "EGTT"]);
    assert!(f.matches(&sample(Some("EGGX"), None, None, None)));
    assert!(f.matches(&sample(Some("EGTT"), None, None, None)));
    assert!(!f.matches(&sample(Some("LFFF"), None, None, None)));
    assert!(!f.matches(&sample(None, None, None, None)));
  }

  #[test]
  fn airport_matches_departure_or_destination() {
    let f = SampleFilter::none().with_airports(["KJFK"]);
    assert!(f.matches(&sample(None, Some("KJFK"), Some("EGLL"), None)));
    assert!(f.matches(&sample(None, Some("EGLL"), Some("KJFK"), None)));
    assert!(!f.matches(&sample(None, Some("EGLL"), Some("LFPG"), None)));
  }

  #[test]
  fn altitude_bounds() {
    let both = AltitudeRange { min: Some(1000), max: Some(5000) };
    assert!(both.contains(Some(1000)));
    assert!(both.contains(Some(5000)));
    assert!(!both.contains(Some(999)));
    assert!(!both.contains(Some(5001)));
    assert!(!both.contains(None));

    let floor = AltitudeRange { min: Some(1000), max: None };
    assert!(floor.contains(Some(40_000)));
    assert!(!floor.contains(Some(500)));

    let ceiling = AltitudeRange { min: None, max: Some(1000) };
    assert!(ceiling.contains(Some(-50)));
    assert!(!ceiling.contains(None));

    assert!(AltitudeRange::default().contains(None));
  }

  #[test]
  fn categories_combine_with_and() {
    let f = SampleFilter::none()
      .with_airspaces(["EGTT"])
      .with_airports(["EGLL"])
      .with_altitude(Some(10_000), None);

    assert!(f.matches(&sample(Some("EGTT"), Some("EGLL"), None, Some(12_000))));
    assert!(!f.matches(&sample(Some("LFFF"), Some("EGLL"), None, Some(12_000))));
    assert!(!f.matches(&sample(Some("EGTT"), Some("LFPG"), None, Some(12_000))));
    assert!(!f.matches(&sample(Some("EGTT"), Some("EGLL"), None, Some(8_000))));
    assert!(!f.matches(&sample(Some("EGTT"), Some("EGLL"), None, None)));
  }
}
