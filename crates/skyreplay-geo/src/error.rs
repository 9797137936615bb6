//! Error type for `skyreplay-geo`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("boundary source returned status {0}")]
  Status(u16),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("geojson error: {0}")]
  GeoJson(#[from] geojson::Error),

  #[error("document is not a feature collection")]
  NotFeatureCollection,

  #[error("feature collection contains no usable features")]
  NoUsableFeatures,

  #[error("no boundary sources configured")]
  NoSources,

  #[error("all {attempted} boundary sources failed")]
  AllSourcesFailed { attempted: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
