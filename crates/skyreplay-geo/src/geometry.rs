//! Planar polygon geometry over lon/lat, on top of the `geo` crate.
//!
//! Boundaries are small relative to the globe, so containment is evaluated in
//! plain lon/lat space without projection: `x` is longitude, `y` latitude.
//! A point on a polygon edge is not inside it.

use geo::{BoundingRect, Contains, CoordsIter, LineString, MultiPolygon, Point, Polygon, Rect};

/// Distinct vertices of a ring, ignoring the closing repeat and consecutive
/// duplicates.
fn distinct_vertices(ring: &LineString<f64>) -> usize {
  let mut coords = ring.0.clone();
  if coords.len() > 1 && coords.first() == coords.last() {
    coords.pop();
  }
  coords.dedup();
  coords.len()
}

/// Fewer than three distinct vertices encloses nothing.
pub fn is_degenerate(ring: &LineString<f64>) -> bool { distinct_vertices(ring) < 3 }

/// `None` if any coordinate is not finite or the exterior is degenerate.
/// Degenerate holes are dropped.
pub fn sanitize(polygon: Polygon<f64>) -> Option<Polygon<f64>> {
  if !polygon.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
    return None;
  }
  if is_degenerate(polygon.exterior()) {
    return None;
  }
  let (exterior, interiors) = polygon.into_inner();
  let interiors = interiors.into_iter().filter(|r| !is_degenerate(r)).collect();
  Some(Polygon::new(exterior, interiors))
}

// ─── Region ──────────────────────────────────────────────────────────────────

/// One or more polygons with a cached bounding box covering all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
  shape: MultiPolygon<f64>,
  bbox:  Rect<f64>,
}

impl Region {
  /// Keeps the polygons that pass [`sanitize`]; `None` if none do.
  pub fn new(polygons: impl IntoIterator<Item = Polygon<f64>>) -> Option<Self> {
    let shape = MultiPolygon::new(polygons.into_iter().filter_map(sanitize).collect());
    let bbox = shape.bounding_rect()?;
    Some(Self { shape, bbox })
  }

  pub fn polygons(&self) -> &[Polygon<f64>] { &self.shape.0 }

  pub fn bbox(&self) -> Rect<f64> { self.bbox }

  /// Bounding box first (inclusive on every edge), then the polygons.
  pub fn contains(&self, lon: f64, lat: f64) -> bool {
    let (min, max) = (self.bbox.min(), self.bbox.max());
    if lon < min.x || lon > max.x || lat < min.y || lat > max.y {
      return false;
    }
    let point = Point::new(lon, lat);
    self.shape.0.iter().any(|polygon| polygon.contains(&point))
  }
}

#[cfg(test)]
mod tests {
  use geo::Coord;

  use super::*;

  fn ring(points: &[(f64, f64)]) -> LineString<f64> { LineString::from(points.to_vec()) }

  fn square(min: f64, max: f64) -> LineString<f64> {
    ring(&[(min, min), (max, min), (max, max), (min, max), (min, min)])
  }

  fn solid(exterior: LineString<f64>) -> Polygon<f64> { Polygon::new(exterior, vec![]) }

  #[test]
  fn bbox_spans_every_polygon() {
    let region = Region::new([solid(square(0.0, 1.0)), solid(square(5.0, 6.0))]).unwrap();
    assert_eq!(region.bbox().min(), Coord { x: 0.0, y: 0.0 });
    assert_eq!(region.bbox().max(), Coord { x: 6.0, y: 6.0 });
    assert!(region.contains(0.5, 0.5));
    assert!(region.contains(5.5, 5.5));
    // Inside the box, between the polygons.
    assert!(!region.contains(3.0, 3.0));
    assert!(!region.contains(6.1, 5.5));
  }

  #[test]
  fn concave_exterior() {
    // A "U" shape open to the north.
    let u = ring(&[
      (0.0, 0.0),
      (3.0, 0.0),
      (3.0, 3.0),
      (2.0, 3.0),
      (2.0, 1.0),
      (1.0, 1.0),
      (1.0, 3.0),
      (0.0, 3.0),
    ]);
    let region = Region::new([solid(u)]).unwrap();
    assert!(region.contains(0.5, 2.0));
    assert!(region.contains(2.5, 2.0));
    assert!(region.contains(1.5, 0.5));
    assert!(!region.contains(1.5, 2.0));
  }

  #[test]
  fn unclosed_and_closed_rings_agree() {
    let open = ring(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
    assert_eq!(Region::new([solid(open)]), Region::new([solid(square(0.0, 4.0))]));
  }

  #[test]
  fn holes_are_excluded() {
    let region = Region::new([Polygon::new(square(0.0, 10.0), vec![square(4.0, 6.0)])]).unwrap();
    assert!(region.contains(2.0, 2.0));
    assert!(!region.contains(5.0, 5.0));
    assert!(!region.contains(11.0, 5.0));
  }

  #[test]
  fn degenerate_rings_never_match() {
    let line = ring(&[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
    assert!(is_degenerate(&line));
    assert!(Region::new([solid(line)]).is_none());

    let repeated = ring(&[(0.0, 0.0), (0.0, 0.0), (1.0, 0.0), (1.0, 0.0)]);
    assert!(is_degenerate(&repeated));
    assert!(Region::new([solid(ring(&[]))]).is_none());

    // A degenerate hole is dropped rather than carving anything out.
    let slit = ring(&[(4.0, 4.0), (6.0, 6.0), (4.0, 4.0)]);
    let region = Region::new([Polygon::new(square(0.0, 10.0), vec![slit])]).unwrap();
    assert!(region.polygons()[0].interiors().is_empty());
    assert!(region.contains(5.0, 5.0));
  }

  #[test]
  fn non_finite_polygons_are_dropped_before_the_bbox() {
    let broken = ring(&[(20.0, 20.0), (f64::NAN, 20.0), (30.0, 30.0), (20.0, 30.0)]);
    let region = Region::new([solid(broken), solid(square(0.0, 1.0))]).unwrap();
    assert_eq!(region.polygons().len(), 1);
    assert_eq!(region.bbox().max(), Coord { x: 1.0, y: 1.0 });

    let infinite = ring(&[(0.0, 0.0), (f64::INFINITY, 0.0), (1.0, 1.0)]);
    assert!(Region::new([solid(infinite)]).is_none());
  }
}
