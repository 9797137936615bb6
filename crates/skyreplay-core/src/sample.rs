//! Sample types: one ingested position record per pilot or controller per
//! poll cycle.
//!
//! Samples are immutable once written. The store assigns the cycle timestamp
//! to every row of a [`Batch`]; callers build `New*` values without one, the
//! same way a fact is recorded without a `recorded_at`.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Airport codes ───────────────────────────────────────────────────────────

/// Normalise an airport code: trimmed, upper-cased, exactly four ASCII
/// alphanumerics. Anything else is treated as absent.
pub fn normalize_airport(code: &str) -> Option<String> {
  let code = code.trim();
  if code.len() == 4 && code.chars().all(|c| c.is_ascii_alphanumeric()) {
    Some(code.to_ascii_uppercase())
  } else {
    None
  }
}

// ─── Pilots ──────────────────────────────────────────────────────────────────

/// A pilot position as received from the feed, before it is stamped with a
/// cycle timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPilot {
  pub callsign:    String,
  /// Network-wide identifier of the person flying.
  pub subject_id:  i64,
  pub latitude:    f64,
  pub longitude:   f64,
  /// Feet above mean sea level.
  pub altitude:    Option<i32>,
  /// Knots.
  pub groundspeed: Option<i32>,
  /// Degrees true.
  pub heading:     Option<i32>,
  /// Label of the airspace the position falls in; assigned at ingest.
  pub airspace:    Option<String>,
  pub departure:   Option<String>,
  pub destination: Option<String>,
}

impl NewPilot {
  /// Convenience constructor with all optional fields unset.
  pub fn new(
    callsign: impl Into<String>,
    subject_id: i64,
    latitude: f64,
    longitude: f64,
  ) -> Self {
    Self {
      callsign: callsign.into(),
      subject_id,
      latitude,
      longitude,
      altitude: None,
      groundspeed: None,
      heading: None,
      airspace: None,
      departure: None,
      destination: None,
    }
  }

  /// Reject rows that cannot be stored: empty callsign or a non-finite
  /// coordinate.
  pub fn validate(&self) -> Result<()> {
    if self.callsign.trim().is_empty() {
      return Err(Error::InvalidSample {
        callsign: self.callsign.clone(),
        reason:   "empty callsign",
      });
    }
    if !self.latitude.is_finite() || !self.longitude.is_finite() {
      return Err(Error::InvalidSample {
        callsign: self.callsign.clone(),
        reason:   "non-finite position",
      });
    }
    Ok(())
  }

  /// Stamp this row with the cycle timestamp.
  pub fn at(self, timestamp: i64) -> PilotSample {
    PilotSample {
      timestamp,
      callsign: self.callsign,
      subject_id: self.subject_id,
      latitude: self.latitude,
      longitude: self.longitude,
      altitude: self.altitude,
      groundspeed: self.groundspeed,
      heading: self.heading,
      airspace: self.airspace,
      departure: self.departure,
      destination: self.destination,
    }
  }
}

/// A stored pilot position.
///
/// Identified by `(timestamp, callsign)`, though duplicates are tolerated when
/// a cycle is re-ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PilotSample {
  /// Epoch seconds of the poll cycle that produced this row.
  pub timestamp:   i64,
  pub callsign:    String,
  pub subject_id:  i64,
  pub latitude:    f64,
  pub longitude:   f64,
  pub altitude:    Option<i32>,
  pub groundspeed: Option<i32>,
  pub heading:     Option<i32>,
  pub airspace:    Option<String>,
  pub departure:   Option<String>,
  pub destination: Option<String>,
}

// ─── Controllers ─────────────────────────────────────────────────────────────

/// A controller position as received from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewController {
  pub callsign:   String,
  pub subject_id: i64,
  /// Primary frequency as published, e.g. `"118.500"`.
  pub frequency:  Option<String>,
  /// Numeric facility type reported by the network.
  pub facility:   Option<i32>,
  pub latitude:   Option<f64>,
  pub longitude:  Option<f64>,
}

impl NewController {
  pub fn new(callsign: impl Into<String>, subject_id: i64) -> Self {
    Self {
      callsign: callsign.into(),
      subject_id,
      frequency: None,
      facility: None,
      latitude: None,
      longitude: None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.callsign.trim().is_empty() {
      return Err(Error::InvalidSample {
        callsign: self.callsign.clone(),
        reason:   "empty callsign",
      });
    }
    Ok(())
  }

  pub fn at(self, timestamp: i64) -> ControllerSample {
    ControllerSample {
      timestamp,
      callsign: self.callsign,
      subject_id: self.subject_id,
      frequency: self.frequency,
      facility: self.facility,
      latitude: self.latitude,
      longitude: self.longitude,
    }
  }
}

/// A stored controller position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSample {
  pub timestamp:  i64,
  pub callsign:   String,
  pub subject_id: i64,
  pub frequency:  Option<String>,
  pub facility:   Option<i32>,
  pub latitude:   Option<f64>,
  pub longitude:  Option<f64>,
}

// ─── Batch ───────────────────────────────────────────────────────────────────

/// Every row produced by one poll cycle. Written as a single transaction.
#[derive(Debug, Clone, Default)]
pub struct Batch {
  pub timestamp:   i64,
  pub pilots:      Vec<NewPilot>,
  pub controllers: Vec<NewController>,
}

impl Batch {
  pub fn new(timestamp: i64) -> Self {
    Self { timestamp, pilots: Vec::new(), controllers: Vec::new() }
  }

  /// Total number of rows across both tables.
  pub fn len(&self) -> usize { self.pilots.len() + self.controllers.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}
