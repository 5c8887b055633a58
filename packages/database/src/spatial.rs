//! Great-circle distance and search-window helpers.
//!
//! Distances use the `geo` crate's haversine formula on a sphere of mean
//! Earth radius. [`search_bounds`] produces a latitude/longitude window
//! guaranteed to contain every point within the radius, for use as an
//! index prefilter.

use crime_report_models::GeoPoint;
use geo::{Distance as _, Haversine, Point};

/// Mean Earth radius in meters (IUGG), the radius `geo` uses for
/// haversine distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Slack added to every edge of a search window, in degrees, so that
/// float rounding in the index never excludes a boundary point.
const WINDOW_SLACK_DEGREES: f64 = 1e-6;

/// A latitude/longitude window in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Whether `point` lies inside the window (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.west..=self.east).contains(&point.longitude)
            && (self.south..=self.north).contains(&point.latitude)
    }
}

/// Great-circle distance between two points in meters.
#[must_use]
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    Haversine.distance(
        Point::new(a.longitude, a.latitude),
        Point::new(b.longitude, b.latitude),
    )
}

/// Returns a window containing every point within `radius_meters` of
/// `center`.
///
/// When the circle reaches a pole or crosses the antimeridian the window
/// widens to the full longitude range instead of wrapping.
#[must_use]
pub fn search_bounds(center: GeoPoint, radius_meters: f64) -> BoundingBox {
    let angular = radius_meters / EARTH_RADIUS_METERS;
    let lat_delta = angular.to_degrees();

    let south = (center.latitude - lat_delta - WINDOW_SLACK_DEGREES).max(-90.0);
    let north = (center.latitude + lat_delta + WINDOW_SLACK_DEGREES).min(90.0);

    let full_width = BoundingBox {
        west: -180.0,
        south,
        east: 180.0,
        north,
    };

    if south <= -90.0 || north >= 90.0 {
        return full_width;
    }

    // Widest longitude span of a spherical cap that doesn't contain a pole.
    let ratio = angular.sin() / center.latitude.to_radians().cos();
    if !(0.0..1.0).contains(&ratio) {
        return full_width;
    }
    let lng_delta = ratio.asin().to_degrees() + WINDOW_SLACK_DEGREES;

    let west = center.longitude - lng_delta;
    let east = center.longitude + lng_delta;
    if west < -180.0 || east > 180.0 {
        return full_width;
    }

    BoundingBox {
        west,
        south,
        east,
        north,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: GeoPoint = GeoPoint::new(-0.09, 51.505);

    #[test]
    fn distance_is_zero_for_same_point() {
        assert!(distance_meters(LONDON, LONDON).abs() < 1e-6);
    }

    #[test]
    fn one_hundredth_degree_of_latitude_is_about_1112_meters() {
        let north = GeoPoint::new(LONDON.longitude, LONDON.latitude + 0.01);
        let d = distance_meters(LONDON, north);
        assert!((d - 1112.0).abs() < 2.0, "got {d}");
    }

    #[test]
    fn bounds_contain_points_on_the_circle() {
        let radius = 5_000.0;
        let bounds = search_bounds(LONDON, radius);

        // Walk the compass and step just inside the radius.
        for bearing_deg in (0..360).step_by(15) {
            let bearing = f64::from(bearing_deg).to_radians();
            let angular = (radius * 0.999) / EARTH_RADIUS_METERS;
            let lat1 = LONDON.latitude.to_radians();
            let lng1 = LONDON.longitude.to_radians();
            let lat2 = (lat1.sin() * angular.cos()
                + lat1.cos() * angular.sin() * bearing.cos())
            .asin();
            let lng2 = lng1
                + (bearing.sin() * angular.sin() * lat1.cos())
                    .atan2(angular.cos() - lat1.sin() * lat2.sin());
            let point = GeoPoint::new(lng2.to_degrees(), lat2.to_degrees());

            assert!(distance_meters(LONDON, point) <= radius);
            assert!(
                bounds.contains(point),
                "bearing {bearing_deg} point {point:?} outside {bounds:?}"
            );
        }
    }

    #[test]
    fn bounds_widen_near_poles_and_antimeridian() {
        let polar = search_bounds(GeoPoint::new(10.0, 89.99), 5_000.0);
        assert!((polar.west - -180.0).abs() < f64::EPSILON);
        assert!((polar.east - 180.0).abs() < f64::EPSILON);
        assert!((polar.north - 90.0).abs() < f64::EPSILON);

        let dateline = search_bounds(GeoPoint::new(179.99, 0.0), 5_000.0);
        assert!((dateline.west - -180.0).abs() < f64::EPSILON);
        assert!((dateline.east - 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_radius_window_still_contains_center() {
        assert!(search_bounds(LONDON, 0.0).contains(LONDON));
    }
}
