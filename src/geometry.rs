//! Point-to-polyline distance and side-of-line tests.
//!
//! Distances use a local equirectangular projection per segment, which is accurate to
//! well under a meter at block scale and far cheaper than haversine per vertex.

use crate::types::{Location, Polyline, Side};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Shortest distance in meters from `point` to any segment of `polyline`.
///
/// Returns `f64::INFINITY` when the polyline has fewer than two usable vertices.
///
/// ```
/// use sweepsafe::{geometry::distance_meters, Location, Polyline};
///
/// let line = Polyline::from_lng_lat(&[(-122.4200, 37.7600), (-122.4190, 37.7600)]);
/// let on_line = Location::new(37.7600, -122.4195);
/// assert!(distance_meters(&on_line, &line) < 0.01);
/// ```
pub fn distance_meters(point: &Location, polyline: &Polyline) -> f64 {
    polyline
        .usable_points()
        .windows(2)
        .map(|pair| segment_distance_meters(point, &pair[0], &pair[1]))
        .fold(f64::INFINITY, f64::min)
}

fn segment_distance_meters(point: &Location, a: &Location, b: &Location) -> f64 {
    let lon_scale = ((a.latitude + b.latitude) / 2.0).to_radians().cos();
    let project = |loc: &Location| {
        (
            loc.longitude.to_radians() * lon_scale,
            loc.latitude.to_radians(),
        )
    };

    let (px, py) = project(point);
    let (ax, ay) = project(a);
    let (bx, by) = project(b);
    let (dx, dy) = (bx - ax, by - ay);

    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    };

    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (px - cx).hypot(py - cy) * EARTH_RADIUS_METERS
}

/// Which side of the polyline's overall direction `point` lies on.
///
/// Only the first and last vertices are used, in raw (longitude, latitude) space.
/// Degenerate polylines report [`Side::Right`].
pub fn side_of(point: &Location, polyline: &Polyline) -> Side {
    let points = polyline.usable_points();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Side::Right;
    };

    let (dx, dy) = (
        last.longitude - first.longitude,
        last.latitude - first.latitude,
    );
    let (vx, vy) = (
        point.longitude - first.longitude,
        point.latitude - first.latitude,
    );

    if dx * vy - dy * vx > 0.0 {
        Side::Left
    } else {
        Side::Right
    }
}

/// Mean of the usable vertices.
pub fn centroid(polyline: &Polyline) -> Option<Location> {
    let points = polyline.usable_points();
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lat, lon) = points.iter().fold((0.0, 0.0), |(lat, lon), p| {
        (lat + p.latitude, lon + p.longitude)
    });
    Some(Location::new(lat / n, lon / n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn block() -> Polyline {
        Polyline::from_lng_lat(&[
            (-122.4200, 37.7600),
            (-122.4190, 37.7600),
            (-122.4185, 37.7605),
        ])
    }

    fn reversed(line: &Polyline) -> Polyline {
        Polyline::new(line.points.iter().rev().copied().collect())
    }

    #[test]
    fn test_point_on_segment_is_zero() {
        let line = block();
        assert_abs_diff_eq!(
            distance_meters(&Location::new(37.7600, -122.4195), &line),
            0.0,
            epsilon = 0.01
        );
        assert_abs_diff_eq!(
            distance_meters(&Location::new(37.76025, -122.41875), &line),
            0.0,
            epsilon = 0.01
        );
        // Vertices themselves
        for p in &line.points {
            assert_abs_diff_eq!(distance_meters(p, &line), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_distance_north_of_line() {
        // 0.001 degrees of latitude is ~111.2 m
        let line = block();
        let d = distance_meters(&Location::new(37.7590, -122.4195), &line);
        assert_abs_diff_eq!(d, 111.19, epsilon = 0.5);
    }

    #[test]
    fn test_distance_clamps_to_endpoint() {
        let line = Polyline::from_lng_lat(&[(-122.4200, 37.7600), (-122.4190, 37.7600)]);
        let beyond = Location::new(37.7600, -122.4180);
        let to_end = distance_meters(&beyond, &line);
        let expected = 0.001_f64.to_radians() * 37.76_f64.to_radians().cos() * EARTH_RADIUS_METERS;
        assert_abs_diff_eq!(to_end, expected, epsilon = 0.01);
    }

    #[test]
    fn test_distance_symmetric_under_reversal() {
        let line = block();
        let rev = reversed(&line);
        for point in [
            Location::new(37.7610, -122.4193),
            Location::new(37.7590, -122.4210),
            Location::new(37.7604, -122.4180),
        ] {
            assert_abs_diff_eq!(
                distance_meters(&point, &line),
                distance_meters(&point, &rev),
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn test_degenerate_polylines_are_infinite() {
        let point = Location::new(37.76, -122.42);
        assert_eq!(distance_meters(&point, &Polyline::default()), f64::INFINITY);
        let single = Polyline::from_lng_lat(&[(-122.42, 37.76)]);
        assert_eq!(distance_meters(&point, &single), f64::INFINITY);
        let with_nan = Polyline::from_lng_lat(&[(-122.42, 37.76), (f64::NAN, 37.77)]);
        assert_eq!(distance_meters(&point, &with_nan), f64::INFINITY);
    }

    #[test]
    fn test_side_of_and_reversal() {
        // Drawn west to east, so north is on the left
        let line = Polyline::from_lng_lat(&[(-122.4200, 37.7600), (-122.4190, 37.7600)]);
        let north = Location::new(37.7601, -122.4195);
        let south = Location::new(37.7599, -122.4195);

        assert_eq!(side_of(&north, &line), Side::Left);
        assert_eq!(side_of(&south, &line), Side::Right);

        let rev = reversed(&line);
        assert_eq!(side_of(&north, &rev), Side::Right);
        assert_eq!(side_of(&south, &rev), Side::Left);
    }

    #[test]
    fn test_side_of_degenerate_defaults_right() {
        let point = Location::new(37.7601, -122.4195);
        assert_eq!(side_of(&point, &Polyline::default()), Side::Right);
        let stub = Polyline::from_lng_lat(&[(-122.42, 37.76), (-122.42, 37.76)]);
        assert_eq!(side_of(&point, &stub), Side::Right);
    }

    #[test]
    fn test_centroid() {
        let c = centroid(&Polyline::from_lng_lat(&[(-122.42, 37.76), (-122.40, 37.78)])).unwrap();
        assert_abs_diff_eq!(c.latitude, 37.77, epsilon = 1e-9);
        assert_abs_diff_eq!(c.longitude, -122.41, epsilon = 1e-9);
        assert!(centroid(&Polyline::default()).is_none());
    }
}
