//! Extraction of labelled boundary features from a GeoJSON document.
//!
//! The schema is tolerated loosely. A feature is kept only if a label can be
//! derived and its geometry yields at least one non-degenerate polygon.

use geo::Polygon;
use geojson::{Feature, GeoJson, feature::Id};

use crate::{Error, Result, geometry::Region};

/// Property names tried, in order, when the feature has no usable `id`.
pub const LABEL_PROPERTIES: &[&str] = &["id", "name", "icao", "ICAO", "designator", "ident"];

/// A named airspace region.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
  pub label:  String,
  pub region: Region,
}

impl BoundaryFeature {
  /// `None` if no polygon is usable.
  pub fn new(label: impl Into<String>, polygons: impl IntoIterator<Item = Polygon<f64>>) -> Option<Self> {
    Some(Self { label: label.into(), region: Region::new(polygons)? })
  }

  pub fn from_geojson(feature: &Feature) -> Option<Self> {
    let label = derive_label(feature)?;
    let mut polygons = Vec::new();
    collect_polygons(&feature.geometry.as_ref()?.value, &mut polygons);
    Self::new(label, polygons)
  }

  pub fn contains(&self, lon: f64, lat: f64) -> bool { self.region.contains(lon, lat) }
}

/// First non-empty of the feature id and [`LABEL_PROPERTIES`], after
/// [`normalize_label`].
fn derive_label(feature: &Feature) -> Option<String> {
  let from_id = feature.id.as_ref().map(|id| match id {
    Id::String(s) => s.clone(),
    Id::Number(n) => n.to_string(),
  });

  let from_props = LABEL_PROPERTIES.iter().map(|key| {
    feature
      .properties
      .as_ref()
      .and_then(|props| props.get(*key))
      .and_then(|value| match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
      })
  });

  std::iter::once(from_id)
    .chain(from_props)
    .flatten()
    .map(|label| normalize_label(&label))
    .find(|label| !label.is_empty())
}

/// Upper-case ASCII with runs of whitespace and commas joined by `_`, so a
/// label is always exactly one airspace filter token.
pub fn normalize_label(raw: &str) -> String {
  raw
    .split(|c: char| c == ',' || c.is_whitespace())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("_")
    .to_ascii_uppercase()
}

/// Positions with fewer than two values are rejected up front; the
/// `geo-types` conversion indexes them directly.
fn to_polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
  if rings.is_empty() || rings.iter().flatten().any(|pos| pos.len() < 2) {
    return None;
  }
  Polygon::try_from(geojson::Value::Polygon(rings.to_vec())).ok()
}

/// Flatten Polygon, MultiPolygon and (nested) GeometryCollection values.
/// Non-areal geometries contribute nothing.
fn collect_polygons(value: &geojson::Value, out: &mut Vec<Polygon<f64>>) {
  match value {
    geojson::Value::Polygon(rings) => out.extend(to_polygon(rings)),
    geojson::Value::MultiPolygon(polys) => out.extend(polys.iter().filter_map(|p| to_polygon(p))),
    geojson::Value::GeometryCollection(geoms) => {
      for g in geoms {
        collect_polygons(&g.value, out);
      }
    }
    _ => {}
  }
}

/// Parse a GeoJSON document and extract its usable features in document
/// order.
pub fn parse_feature_collection(text: &str) -> Result<Vec<BoundaryFeature>> {
  let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
    return Err(Error::NotFeatureCollection);
  };

  let total = collection.features.len();
  let features: Vec<BoundaryFeature> = collection
    .features
    .iter()
    .filter_map(BoundaryFeature::from_geojson)
    .collect();

  if features.len() < total {
    tracing::debug!(total, kept = features.len(), "dropped unusable boundary features");
  }
  Ok(features)
}
