//! Planar spatial predicates over (lat, lon) points
//!
//! Coordinates are treated as plain cartesian values. Zones are small
//! (a few kilometres) so the distortion of the lat/lon plane is irrelevant
//! for inside/outside decisions.
//!
//! ## Boundary behaviour
//!
//! Points lying exactly on a polygon edge and exactly collinear segments are
//! not classified consistently. Both follow from the arithmetic of the
//! ray-casting and orientation tests and are not part of the contract.

use serde::{Deserialize, Serialize};

/// A geographic point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build from a provider `[lon, lat]` pair (GeoJSON order)
    pub fn from_lon_lat(pair: [f64; 2]) -> Self {
        Self {
            lat: pair[1],
            lon: pair[0],
        }
    }

    /// Provider `[lon, lat]` pair (GeoJSON order)
    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

impl From<[f64; 2]> for Point {
    /// Interprets the pair as `[lat, lon]`, the order used by zone documents
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

/// Ray-casting point-in-polygon test.
///
/// The ray runs along increasing longitude from `point`. An edge is counted
/// when it strictly straddles the point's longitude (`(yi > lon) != (yj > lon)`)
/// and the crossing lies beyond the point's latitude. The polygon is
/// implicitly closed.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.is_empty() {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].lat, polygon[i].lon);
        let (xj, yj) = (polygon[j].lat, polygon[j].lon);

        if (yi > point.lon) != (yj > point.lon)
            && point.lat < (xj - xi) * (point.lon - yi) / (yj - yi) + xi
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn ccw(a: Point, b: Point, c: Point) -> bool {
    (c.lon - a.lon) * (b.lat - a.lat) > (b.lon - a.lon) * (c.lat - a.lat)
}

/// Whether segment `p1-p2` crosses segment `p3-p4`.
///
/// Two segments intersect iff each one's endpoints lie on opposite sides of
/// the other's supporting line.
pub fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    ccw(p1, p3, p4) != ccw(p2, p3, p4) && ccw(p1, p2, p3) != ccw(p1, p2, p4)
}

/// Authoritative violation test: any route vertex inside the polygon, or any
/// route segment crossing any polygon edge (closing edge included).
pub fn route_intersects_polygon(route: &[Point], polygon: &[Point]) -> bool {
    if polygon.is_empty() {
        return false;
    }

    if route.iter().any(|&pt| point_in_polygon(pt, polygon)) {
        return true;
    }

    let n = polygon.len();
    route.windows(2).any(|seg| {
        (0..n).any(|j| segments_intersect(seg[0], seg[1], polygon[j], polygon[(j + 1) % n]))
    })
}

/// Axis-aligned bounding box in lat/lon
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BBox {
    /// Bounding box of `points`. An empty slice yields the zero box.
    pub fn of(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };

        points.iter().skip(1).fold(
            Self {
                min_lat: first.lat,
                min_lon: first.lon,
                max_lat: first.lat,
                max_lon: first.lon,
            },
            |b, p| Self {
                min_lat: b.min_lat.min(p.lat),
                min_lon: b.min_lon.min(p.lon),
                max_lat: b.max_lat.max(p.lat),
                max_lon: b.max_lon.max(p.lon),
            },
        )
    }

    /// Non-strict overlap: boxes that only touch count as intersecting
    pub fn intersects(&self, other: &BBox) -> bool {
        !(self.max_lat < other.min_lat
            || other.max_lat < self.min_lat
            || self.max_lon < other.min_lon
            || other.max_lon < self.min_lon)
    }

    pub fn contains(&self, point: Point) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        ]
    }

    // Concave "U" shape opening towards high latitude
    fn u_shape() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 9.0),
            Point::new(9.0, 9.0),
            Point::new(9.0, 6.0),
            Point::new(3.0, 6.0),
            Point::new(3.0, 3.0),
            Point::new(9.0, 3.0),
            Point::new(9.0, 0.0),
        ]
    }

    #[test]
    fn test_point_in_polygon() {
        let poly = square();
        assert!(point_in_polygon(Point::new(5.0, 5.0), &poly));
        assert!(point_in_polygon(Point::new(0.5, 9.5), &poly));
        assert!(!point_in_polygon(Point::new(-1.0, 5.0), &poly));
        assert!(!point_in_polygon(Point::new(5.0, 11.0), &poly));
    }

    #[test]
    fn test_point_in_concave_polygon() {
        let poly = u_shape();
        assert!(point_in_polygon(Point::new(1.5, 4.5), &poly));
        assert!(point_in_polygon(Point::new(6.0, 1.5), &poly));
        // Inside the notch of the U
        assert!(!point_in_polygon(Point::new(6.0, 4.5), &poly));
    }

    #[test]
    fn test_point_outside_bbox_never_inside() {
        for poly in [square(), u_shape()] {
            let bbox = BBox::of(&poly);
            for lat in [-50.0, -0.01, 4.5, 10.01, 42.0] {
                for lon in [-50.0, -0.01, 4.5, 10.01, 42.0] {
                    let p = Point::new(lat, lon);
                    if !bbox.contains(p) {
                        assert!(!point_in_polygon(p, &poly), "{p:?} outside bbox");
                    }
                }
            }
        }
    }

    #[test]
    fn test_empty_polygon() {
        assert!(!point_in_polygon(Point::new(0.0, 0.0), &[]));
        assert!(!route_intersects_polygon(&[Point::new(0.0, 0.0)], &[]));
    }

    #[test]
    fn test_segments_intersect() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 10.0);
        let c = Point::new(0.0, 10.0);
        let d = Point::new(10.0, 0.0);
        assert!(segments_intersect(a, b, c, d));

        // Parallel, disjoint
        let e = Point::new(1.0, 0.0);
        let f = Point::new(11.0, 10.0);
        assert!(!segments_intersect(a, b, e, f));

        // Would cross only if extended
        let g = Point::new(20.0, 0.0);
        let h = Point::new(15.0, 5.0);
        assert!(!segments_intersect(a, b, g, h));
    }

    #[test]
    fn test_route_through_polygon_without_vertex_inside() {
        let poly = square();
        let route = vec![Point::new(-5.0, 5.0), Point::new(15.0, 5.0)];
        assert!(!route.iter().any(|&p| point_in_polygon(p, &poly)));
        assert!(route_intersects_polygon(&route, &poly));
    }

    #[test]
    fn test_route_with_vertex_inside() {
        let poly = square();
        let route = vec![Point::new(5.0, 5.0)];
        assert!(route_intersects_polygon(&route, &poly));
    }

    #[test]
    fn test_route_around_polygon() {
        let poly = square();
        let route = vec![
            Point::new(-5.0, -5.0),
            Point::new(-5.0, 15.0),
            Point::new(15.0, 15.0),
        ];
        assert!(!route_intersects_polygon(&route, &poly));
    }

    #[test]
    fn test_route_through_notch_of_concave_polygon() {
        let poly = u_shape();
        // Enters the notch from above and stays clear of the arms
        let route = vec![Point::new(20.0, 4.5), Point::new(5.0, 4.5)];
        assert!(!route_intersects_polygon(&route, &poly));

        let deeper = vec![Point::new(20.0, 4.5), Point::new(1.0, 4.5)];
        assert!(route_intersects_polygon(&deeper, &poly));
    }

    #[test]
    fn test_bbox() {
        let bbox = BBox::of(&[
            Point::new(3.0, -2.0),
            Point::new(-1.0, 4.0),
            Point::new(2.0, 1.0),
        ]);
        assert_eq!(
            bbox,
            BBox {
                min_lat: -1.0,
                min_lon: -2.0,
                max_lat: 3.0,
                max_lon: 4.0,
            }
        );
        assert_eq!(BBox::of(&[]), BBox::default());
    }

    #[test]
    fn test_bbox_intersects() {
        let a = BBox::of(&square());
        let touching = BBox::of(&[Point::new(10.0, 10.0), Point::new(20.0, 20.0)]);
        let apart = BBox::of(&[Point::new(10.5, 0.0), Point::new(20.0, 20.0)]);
        assert!(a.intersects(&touching));
        assert!(touching.intersects(&a));
        assert!(!a.intersects(&apart));
    }

    #[test]
    fn test_lon_lat_conversion() {
        let p = Point::from_lon_lat([75.78, 11.25]);
        assert_eq!(p, Point::new(11.25, 75.78));
        assert_eq!(p.to_lon_lat(), [75.78, 11.25]);
    }
}
