//! Geographic points and the planar distance used by every geofence
//!
//! Distances use an equirectangular projection around the mean latitude of
//! the two points: longitude delta scaled by `cos(mean_lat)`, latitude delta
//! unscaled, Pythagorean norm. At racetrack scale (a few hundred meters) the
//! error is centimetres. This is not a great-circle distance and is not meant
//! to be one; lap thresholds are tuned against exactly this approximation.

use libm::{cos, sqrt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the planar approximation (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in degrees
///
/// `(0, 0)` is the "no fix" sentinel used throughout the logger and is never
/// a valid point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    /// Latitude in degrees (positive = North)
    pub latitude: f64,
    /// Longitude in degrees (positive = East)
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True unless this is the zero sentinel or holds non-finite coordinates
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    /// Planar distance to `other` in meters
    pub fn distance_to(&self, other: &GeoPoint) -> f32 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let x = dlon * cos((lat1 + lat2) / 2.0);
        let y = dlat;

        (sqrt(x * x + y * y) * EARTH_RADIUS_M) as f32
    }
}

/// A point stamped with milliseconds since the session's first usable fix
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimedPoint {
    pub point: GeoPoint,
    pub millis: u32,
}

impl TimedPoint {
    pub const fn new(point: GeoPoint, millis: u32) -> Self {
        Self { point, millis }
    }

    pub fn is_valid(&self) -> bool {
        self.point.is_valid()
    }

    /// Linear interpolation from `self` towards `to` by fraction `t` (clamped to [0, 1])
    ///
    /// Timestamps are interpolated with wrapping arithmetic so a `u32` tick
    /// counter rolling over between the two samples still lands in between.
    pub fn lerp(&self, to: &TimedPoint, t: f32) -> TimedPoint {
        let t = t.clamp(0.0, 1.0);
        let tf = t as f64;

        let latitude = self.point.latitude + (to.point.latitude - self.point.latitude) * tf;
        let longitude = self.point.longitude + (to.point.longitude - self.point.longitude) * tf;

        let dt = to.millis.wrapping_sub(self.millis);
        let millis = self.millis.wrapping_add((dt as f64 * tf) as u32);

        TimedPoint {
            point: GeoPoint::new(latitude, longitude),
            millis,
        }
    }
}

/// Elapsed milliseconds from `earlier` to `later`, correct across a `u32` wrap
#[inline]
pub fn elapsed_ms(later: u32, earlier: u32) -> u32 {
    later.wrapping_sub(earlier)
}

/// Meters north of `origin` expressed as a latitude offset in degrees
///
/// Inverse of the latitude term of [`GeoPoint::distance_to`]; handy for
/// building points at a known distance in tests and simulations.
pub fn meters_to_lat_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_M).to_degrees()
}

/// Meters east at latitude `lat` expressed as a longitude offset in degrees
pub fn meters_to_lon_degrees(meters: f64, lat: f64) -> f64 {
    (meters / (EARTH_RADIUS_M * cos(lat.to_radians()))).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Somewhere near a typical club circuit; far from the (0, 0) sentinel
    const ORIGIN: GeoPoint = GeoPoint::new(43.8, -87.99);

    #[test]
    fn test_zero_point_is_invalid() {
        assert!(!GeoPoint::default().is_valid());
        assert!(!GeoPoint::new(0.0, 0.0).is_valid());
    }

    #[test]
    fn test_non_finite_point_is_invalid() {
        assert!(!GeoPoint::new(f64::NAN, 10.0).is_valid());
        assert!(!GeoPoint::new(10.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_point_on_an_axis_is_valid() {
        // Only the (0, 0) pair is the sentinel
        assert!(GeoPoint::new(0.0, 10.0).is_valid());
        assert!(GeoPoint::new(10.0, 0.0).is_valid());
        assert!(ORIGIN.is_valid());
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(ORIGIN.distance_to(&ORIGIN), 0.0);
    }

    #[test]
    fn test_distance_north() {
        let north = GeoPoint::new(ORIGIN.latitude + meters_to_lat_degrees(100.0), ORIGIN.longitude);
        let d = ORIGIN.distance_to(&north);
        assert!((d - 100.0).abs() < 0.01, "Expected ~100m, got {}", d);
    }

    #[test]
    fn test_distance_east_scaled_by_latitude() {
        let east = GeoPoint::new(
            ORIGIN.latitude,
            ORIGIN.longitude + meters_to_lon_degrees(100.0, ORIGIN.latitude),
        );
        let d = ORIGIN.distance_to(&east);
        assert!((d - 100.0).abs() < 0.01, "Expected ~100m, got {}", d);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let other = GeoPoint::new(43.801, -87.985);
        let ab = ORIGIN.distance_to(&other);
        let ba = other.distance_to(&ORIGIN);
        assert!((ab - ba).abs() < 1e-3);
    }

    #[test]
    fn test_one_degree_latitude() {
        // R * pi / 180
        let d = GeoPoint::new(10.0, 20.0).distance_to(&GeoPoint::new(11.0, 20.0));
        assert!((d - 111_194.93).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_lerp_midpoint() {
        let a = TimedPoint::new(GeoPoint::new(10.0, 20.0), 1_000);
        let b = TimedPoint::new(GeoPoint::new(12.0, 24.0), 2_000);
        let mid = a.lerp(&b, 0.5);

        assert!((mid.point.latitude - 11.0).abs() < 1e-9);
        assert!((mid.point.longitude - 22.0).abs() < 1e-9);
        assert_eq!(mid.millis, 1_500);
    }

    #[test]
    fn test_lerp_clamps_fraction() {
        let a = TimedPoint::new(GeoPoint::new(10.0, 20.0), 1_000);
        let b = TimedPoint::new(GeoPoint::new(12.0, 24.0), 2_000);

        assert_eq!(a.lerp(&b, -3.0), a);
        assert_eq!(a.lerp(&b, 7.0).millis, 2_000);
    }

    #[test]
    fn test_lerp_across_clock_wrap() {
        let a = TimedPoint::new(GeoPoint::new(10.0, 20.0), u32::MAX - 99);
        let b = TimedPoint::new(GeoPoint::new(10.0, 20.0), 100);
        // 200ms apart across the wrap; halfway is 0
        assert_eq!(a.lerp(&b, 0.5).millis, 0);
    }

    #[test]
    fn test_elapsed_across_wrap() {
        assert_eq!(elapsed_ms(5, u32::MAX - 4), 10);
        assert_eq!(elapsed_ms(20_000, 5_000), 15_000);
    }
}
