//! Spatial math for restricted-area conflict detection and distance
//! calculations, in nautical miles.

use crate::models::{GeographicBounds, Waypoint};

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.1;

/// Check whether a point lies inside a rectangular bounds.
///
/// Inclusive on all four edges: a point exactly on a boundary counts as
/// inside. Degenerate bounds (north < south) simply never contain anything.
pub fn point_in_bounds(point: &Waypoint, bounds: &GeographicBounds) -> bool {
    point.latitude >= bounds.south
        && point.latitude <= bounds.north
        && point.longitude >= bounds.west
        && point.longitude <= bounds.east
}

/// Check whether a point lies inside a polygon using ray casting.
///
/// Polygons with fewer than 3 vertices never match. Points exactly on an
/// edge get whatever the ray cast happens to report; unlike
/// [`point_in_bounds`] there is no inclusivity guarantee on the boundary.
pub fn point_in_polygon(point: &Waypoint, polygon: &[Waypoint]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = polygon[i].latitude;
        let xi = polygon[i].longitude;
        let yj = polygon[j].latitude;
        let xj = polygon[j].longitude;

        if ((yi > point.latitude) != (yj > point.latitude))
            && (point.longitude < (xj - xi) * (point.latitude - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Great-circle distance between two points in nautical miles.
pub fn haversine_distance_nm(p1: &Waypoint, p2: &Waypoint) -> f64 {
    let phi1 = p1.latitude.to_radians();
    let phi2 = p2.latitude.to_radians();
    let dphi = (p2.latitude - p1.latitude).to_radians();
    let dlambda = (p2.longitude - p1.longitude).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Minimum distance from a point to a line segment, in nautical miles.
///
/// The nearest point on the segment is found by projecting in raw lat/lon
/// space, treating degrees as a flat Cartesian plane; the final distance to
/// that point is then measured with the haversine formula. The projection is
/// not geodesically correct. Test expectations are calibrated against this
/// mixed approach, so it must not be replaced with a great-circle
/// nearest-point solution.
pub fn distance_to_segment_nm(point: &Waypoint, seg_start: &Waypoint, seg_end: &Waypoint) -> f64 {
    let dx = seg_end.longitude - seg_start.longitude;
    let dy = seg_end.latitude - seg_start.latitude;
    let len_sq = dx * dx + dy * dy;

    if len_sq < f64::EPSILON {
        // Segment is essentially a point
        return haversine_distance_nm(point, seg_start);
    }

    let t = (((point.longitude - seg_start.longitude) * dx
        + (point.latitude - seg_start.latitude) * dy)
        / len_sq)
        .clamp(0.0, 1.0);

    let nearest = Waypoint {
        latitude: seg_start.latitude + t * dy,
        longitude: seg_start.longitude + t * dx,
    };

    haversine_distance_nm(point, &nearest)
}

/// Check whether two rectangular bounds overlap.
pub fn bounds_overlap(a: &GeographicBounds, b: &GeographicBounds) -> bool {
    !(a.east < b.west || a.west > b.east || a.north < b.south || a.south > b.north)
}

/// Initial bearing from `p1` to `p2` in degrees, normalized to [0, 360).
pub fn bearing_deg(p1: &Waypoint, p2: &Waypoint) -> f64 {
    let phi1 = p1.latitude.to_radians();
    let phi2 = p2.latitude.to_radians();
    let delta_lambda = (p2.longitude - p1.longitude).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(lat, lon)
    }

    #[test]
    fn haversine_one_degree_latitude() {
        // One degree of latitude is 60 nautical miles by definition
        let dist = haversine_distance_nm(&wp(0.0, 0.0), &wp(1.0, 0.0));
        assert!((dist - 60.0).abs() < 0.1, "got {dist}");
    }

    #[test]
    fn haversine_same_point_is_zero() {
        let dist = haversine_distance_nm(&wp(42.36, -70.89), &wp(42.36, -70.89));
        assert!(dist < 1e-9);
    }

    #[test]
    fn bounds_are_inclusive_on_all_edges() {
        let bounds = GeographicBounds {
            north: 43.0,
            south: 42.0,
            east: -70.0,
            west: -71.0,
        };
        assert!(point_in_bounds(&wp(43.0, -70.5), &bounds));
        assert!(point_in_bounds(&wp(42.0, -70.5), &bounds));
        assert!(point_in_bounds(&wp(42.5, -70.0), &bounds));
        assert!(point_in_bounds(&wp(42.5, -71.0), &bounds));
        assert!(point_in_bounds(&wp(42.0, -71.0), &bounds));
        assert!(!point_in_bounds(&wp(43.0001, -70.5), &bounds));
    }

    #[test]
    fn degenerate_bounds_never_match() {
        let bounds = GeographicBounds {
            north: 42.0,
            south: 43.0,
            east: -70.0,
            west: -71.0,
        };
        assert!(!point_in_bounds(&wp(42.5, -70.5), &bounds));
    }

    #[test]
    fn polygon_containment() {
        let square = vec![wp(42.0, -71.0), wp(42.0, -70.0), wp(43.0, -70.0), wp(43.0, -71.0)];
        assert!(point_in_polygon(&wp(42.5, -70.5), &square));
        assert!(!point_in_polygon(&wp(41.5, -70.5), &square));
        assert!(!point_in_polygon(&wp(42.5, -69.5), &square));
    }

    #[test]
    fn degenerate_polygon_never_matches() {
        let too_few = vec![wp(42.0, -71.0), wp(43.0, -70.0)];
        assert!(!point_in_polygon(&wp(42.5, -70.5), &too_few));
        assert!(!point_in_polygon(&wp(42.5, -70.5), &[]));
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        // Point beyond the end of a meridian segment: nearest point is the
        // segment end, one degree of latitude away.
        let dist = distance_to_segment_nm(&wp(44.0, -70.0), &wp(41.0, -70.0), &wp(43.0, -70.0));
        assert!((dist - 60.0).abs() < 0.1, "got {dist}");
    }

    #[test]
    fn segment_distance_perpendicular() {
        // Point abeam the middle of a meridian segment at the equator,
        // one degree of longitude off.
        let dist = distance_to_segment_nm(&wp(0.0, 1.0), &wp(-1.0, 0.0), &wp(1.0, 0.0));
        assert!((dist - 60.0).abs() < 0.2, "got {dist}");
    }

    #[test]
    fn zero_length_segment_falls_back_to_point_distance() {
        let dist = distance_to_segment_nm(&wp(1.0, 0.0), &wp(0.0, 0.0), &wp(0.0, 0.0));
        assert!((dist - 60.0).abs() < 0.1, "got {dist}");
    }

    #[test]
    fn bounds_overlap_detects_separation() {
        let a = GeographicBounds { north: 43.0, south: 42.0, east: -70.0, west: -71.0 };
        let b = GeographicBounds { north: 42.5, south: 41.5, east: -69.5, west: -70.5 };
        let c = GeographicBounds { north: 41.0, south: 40.0, east: -70.0, west: -71.0 };
        assert!(bounds_overlap(&a, &b));
        assert!(!bounds_overlap(&a, &c));
    }

    #[test]
    fn bearing_cardinal_directions() {
        let north = bearing_deg(&wp(0.0, 0.0), &wp(1.0, 0.0));
        let east = bearing_deg(&wp(0.0, 0.0), &wp(0.0, 1.0));
        let south = bearing_deg(&wp(1.0, 0.0), &wp(0.0, 0.0));
        assert!(north.abs() < 0.01, "got {north}");
        assert!((east - 90.0).abs() < 0.01, "got {east}");
        assert!((south - 180.0).abs() < 0.01, "got {south}");
    }
}
