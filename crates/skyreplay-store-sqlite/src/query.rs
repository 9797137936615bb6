//! SQL fragment builders for [`SampleFilter`].
//!
//! Fragments only ever contain `?` placeholders; values travel separately in
//! the parameter list, in placeholder order.

use rusqlite::types::Value;
use skyreplay_core::filter::SampleFilter;

/// Largest number of values bound into a single `IN (…)` list.
pub const IN_CHUNK: usize = 500;

/// `?, ?, …` with `n` placeholders.
pub fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

/// Append the filter's conditions to a `WHERE` clause.
///
/// Returns an empty string when the filter is empty, otherwise a string
/// starting with ` AND `. Each active category becomes one parenthesised
/// condition; values within a category are OR-ed through `IN`.
pub fn filter_clause(filter: &SampleFilter, params: &mut Vec<Value>) -> String {
  let mut conds: Vec<String> = Vec::new();

  if !filter.airspaces.is_empty() {
    conds.push(format!("airspace IN ({})", placeholders(filter.airspaces.len())));
    params.extend(filter.airspaces.iter().cloned().map(Value::Text));
  }

  if !filter.airports.is_empty() {
    let list = placeholders(filter.airports.len());
    conds.push(format!("(departure IN ({list}) OR destination IN ({list}))"));
    params.extend(filter.airports.iter().cloned().map(Value::Text));
    params.extend(filter.airports.iter().cloned().map(Value::Text));
  }

  let altitude = filter.altitude;
  if altitude.is_active() {
    let mut parts = vec!["altitude IS NOT NULL"];
    if let Some(min) = altitude.min {
      parts.push("altitude >= ?");
      params.push(Value::Integer(min.into()));
    }
    if let Some(max) = altitude.max {
      parts.push("altitude <= ?");
      params.push(Value::Integer(max.into()));
    }
    conds.push(format!("({})", parts.join(" AND ")));
  }

  conds.into_iter().map(|c| format!(" AND {c}")).collect()
}
