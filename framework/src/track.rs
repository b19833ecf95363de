//! Track definition and timing configuration
//!
//! A track is a start point, a finish point (the same point on a circuit) and
//! an ordered list of sector waypoints. Unused waypoint slots hold the zero
//! sentinel. A waypoint equal to waypoint 0 marks the end of the list; running
//! past the last configured waypoint behaves the same way.

use crate::geo::GeoPoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of sector waypoints per track
pub const MAX_SECTORS: usize = 20;

/// Meters per degree of latitude at the equator.
/// Used as-is for the geofence radius; not corrected for latitude.
pub const METERS_PER_DEGREE: f32 = 110_574.27;

/// Default geofence radius in degrees (~15m)
pub const DEFAULT_RADIUS_DEGREES: f32 = 0.0001356;

/// Convert a radius configured in degrees to meters
pub fn degrees_to_meters(degrees: f32) -> f32 {
    degrees * METERS_PER_DEGREE
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    pub start: GeoPoint,
    pub finish: GeoPoint,
    /// Sector waypoints in driving order; unused slots are `GeoPoint::default()`
    #[cfg_attr(feature = "serde", serde(default))]
    pub sectors: [GeoPoint; MAX_SECTORS],
}

impl Track {
    /// Circuit: start and finish share one point. Extra waypoints beyond
    /// [`MAX_SECTORS`] are dropped.
    pub fn circuit(start_finish: GeoPoint, waypoints: &[GeoPoint]) -> Self {
        let mut sectors = [GeoPoint::default(); MAX_SECTORS];
        for (slot, wp) in sectors.iter_mut().zip(waypoints) {
            *slot = *wp;
        }
        Self {
            start: start_finish,
            finish: start_finish,
            sectors,
        }
    }

    /// Stage: separate start and finish points, no sectors
    pub fn stage(start: GeoPoint, finish: GeoPoint) -> Self {
        Self {
            start,
            finish,
            sectors: [GeoPoint::default(); MAX_SECTORS],
        }
    }

    pub fn is_start_valid(&self) -> bool {
        self.start.is_valid()
    }

    pub fn is_finish_valid(&self) -> bool {
        self.finish.is_valid()
    }

    /// Waypoint for sector `index`, or waypoint 0 when `index` is past the
    /// configured list
    pub fn sector_point(&self, index: usize) -> GeoPoint {
        match self.sectors.get(index) {
            Some(p) if p.is_valid() => *p,
            _ => self.sectors[0],
        }
    }

    /// Number of waypoints before the end-of-list sentinel
    pub fn sector_count(&self) -> usize {
        let first = self.sectors[0];
        if !first.is_valid() {
            return 0;
        }
        1 + self.sectors[1..]
            .iter()
            .take_while(|p| p.is_valid() && **p != first)
            .count()
    }
}

/// Timing configuration for the session
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrackConfig {
    /// Default track, used as-is unless auto-detection is on
    pub track: Track,
    /// Geofence radius in degrees (converted with [`METERS_PER_DEGREE`])
    pub radius_degrees: f32,
    /// Resolve the active track from the first usable fix
    pub auto_detect: bool,
    /// Sector split timing on/off
    pub sector_timing: bool,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            track: Track::default(),
            radius_degrees: DEFAULT_RADIUS_DEGREES,
            auto_detect: false,
            sector_timing: true,
        }
    }
}

impl TrackConfig {
    pub fn new(track: Track) -> Self {
        Self {
            track,
            ..Default::default()
        }
    }

    pub fn radius_meters(&self) -> f32 {
        degrees_to_meters(self.radius_degrees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(i: u32) -> GeoPoint {
        GeoPoint::new(45.0 + i as f64 * 0.001, 9.28)
    }

    #[test]
    fn test_degrees_to_meters() {
        assert!((degrees_to_meters(1.0) - 110_574.27).abs() < 0.01);
        assert!((degrees_to_meters(0.0001) - 11.057).abs() < 0.001);
    }

    #[test]
    fn test_default_radius_is_about_fifteen_meters() {
        let r = TrackConfig::default().radius_meters();
        assert!((r - 15.0).abs() < 0.1, "got {}", r);
    }

    #[test]
    fn test_circuit_shares_start_and_finish() {
        let t = Track::circuit(wp(0), &[wp(1), wp(2)]);
        assert_eq!(t.start, t.finish);
        assert!(t.is_start_valid());
        assert!(t.is_finish_valid());
    }

    #[test]
    fn test_default_track_is_invalid() {
        let t = Track::default();
        assert!(!t.is_start_valid());
        assert!(!t.is_finish_valid());
        assert_eq!(t.sector_count(), 0);
    }

    #[test]
    fn test_sector_point_in_range() {
        let t = Track::circuit(wp(0), &[wp(1), wp(2), wp(3)]);
        assert_eq!(t.sector_point(0), wp(1));
        assert_eq!(t.sector_point(2), wp(3));
    }

    #[test]
    fn test_sector_point_past_end_is_first_waypoint() {
        let t = Track::circuit(wp(0), &[wp(1), wp(2), wp(3)]);
        assert_eq!(t.sector_point(3), wp(1));
        assert_eq!(t.sector_point(MAX_SECTORS), wp(1));
        assert_eq!(t.sector_point(usize::MAX), wp(1));
    }

    #[test]
    fn test_sector_count_stops_at_sentinel() {
        let t = Track::circuit(wp(0), &[wp(1), wp(2), wp(3), wp(1), wp(5)]);
        assert_eq!(t.sector_count(), 3);

        let t = Track::circuit(wp(0), &[wp(1), wp(2)]);
        assert_eq!(t.sector_count(), 2);
    }

    #[test]
    fn test_circuit_drops_extra_waypoints() {
        let many: [GeoPoint; MAX_SECTORS + 4] = core::array::from_fn(|i| wp(i as u32 + 1));
        let t = Track::circuit(wp(0), &many);
        assert_eq!(t.sector_count(), MAX_SECTORS);
    }

    #[test]
    fn test_stage_has_no_sectors() {
        let t = Track::stage(wp(0), wp(9));
        assert_ne!(t.start, t.finish);
        assert_eq!(t.sector_count(), 0);
    }
}
