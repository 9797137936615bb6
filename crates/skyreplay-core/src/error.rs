//! Error types for `skyreplay-core`.
//!
//! Every variant is a rejected request or input; the offending value is
//! echoed back so callers can report it verbatim.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("invalid range: until ({until}) is before since ({since})")]
  RangeOutOfOrder { since: i64, until: i64 },

  #[error("range span of {span}s exceeds the maximum of {max}s")]
  SpanTooLarge { span: i64, max: i64 },

  #[error("step must be positive, got {0}")]
  NonPositiveStep(i64),

  #[error("window must not be negative, got {0}")]
  NegativeWindow(i64),

  #[error("max_source_age must not be negative, got {0}")]
  NegativeSourceAge(i64),

  #[error("request would produce {count} buckets, above the limit of {max}")]
  TooManyBuckets { count: i64, max: i64 },

  #[error("invalid {name} filter: {value:?}")]
  InvalidFilter { name: &'static str, value: String },

  #[error("unknown column: {0:?}")]
  UnknownColumn(String),

  #[error("invalid sample {callsign:?}: {reason}")]
  InvalidSample { callsign: String, reason: &'static str },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
