//! Airspace boundaries for skyreplay.
//!
//! Loads a GeoJSON feature collection of named polygons, indexes each feature
//! by bounding box, and answers "which airspace is this point in?". Pure
//! geometry lives in [`geometry`]; [`cache::BoundaryCache`] owns the
//! currently loaded [`matcher::FeatureSet`] and swaps it wholesale on refresh.
//!
//! # Quick start
//!
//! ```no_run
//! use skyreplay_geo::feature::parse_feature_collection;
//! use skyreplay_geo::matcher::FeatureSet;
//!
//! let text = std::fs::read_to_string("boundaries.geojson").unwrap();
//! let set = FeatureSet::new(parse_feature_collection(&text).unwrap(), "boundaries.geojson");
//! println!("{:?}", set.lookup(51.47, -0.45));
//! ```

pub mod cache;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod matcher;
pub mod source;

pub use cache::BoundaryCache;
pub use error::{Error, Result};
pub use matcher::FeatureSet;
pub use source::BoundarySource;
