//! Controller position rules: what a controller callsign says about the role
//! and sector being staffed.
//!
//! Callsigns follow the `SECTOR[_INFIX]_SUFFIX` convention, e.g. `EGLL_N_TWR`
//! or `LON_S_CTR`. The suffix picks the role; the first segment names the
//! sector.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerRole {
  Delivery,
  Ground,
  Tower,
  Approach,
  Departure,
  Center,
  FlightService,
  Atis,
  Observer,
  Unknown,
}

impl ControllerRole {
  fn from_suffix(suffix: &str) -> Self {
    match suffix {
      "DEL" => Self::Delivery,
      "GND" => Self::Ground,
      "TWR" => Self::Tower,
      "APP" => Self::Approach,
      "DEP" => Self::Departure,
      "CTR" => Self::Center,
      "FSS" => Self::FlightService,
      "ATIS" => Self::Atis,
      "OBS" => Self::Observer,
      _ => Self::Unknown,
    }
  }

  /// Whether this role controls traffic (as opposed to broadcasting or
  /// watching).
  pub fn is_controlling(&self) -> bool {
    !matches!(self, Self::Atis | Self::Observer | Self::Unknown)
  }
}

/// The classified position a controller is staffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
  pub sector: String,
  pub role:   ControllerRole,
}

/// Classify a controller callsign. Never fails; unrecognised callsigns map to
/// [`ControllerRole::Unknown`].
pub fn classify(callsign: &str) -> Position {
  let upper = callsign.trim().to_ascii_uppercase();
  let mut parts = upper.split(['_', '-']).filter(|p| !p.is_empty());
  let sector = parts.next().unwrap_or_default().to_owned();
  let role = match parts.next_back() {
    Some(suffix) => ControllerRole::from_suffix(suffix),
    None => ControllerRole::Unknown,
  };
  Position { sector, role }
}
