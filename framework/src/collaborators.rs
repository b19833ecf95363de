//! Services the timing engine talks to but does not own
//!
//! Launch detection, track auto-detection, the predictive timer and the
//! distance odometer live elsewhere in the logger. The engine sees them only
//! through these traits, bundled per update in a [`LapContext`].

use crate::geo::GeoPoint;
use crate::gps::{GpsQuality, GpsSample};
use crate::track::{Track, TrackConfig};

/// Detects the very first start of the session (speed/position heuristics)
pub trait LaunchControl {
    /// Arm for a track with the start geofence radius in meters
    fn setup(&mut self, track: &Track, radius_meters: f32);
    fn supply_gps_sample(&mut self, sample: &GpsSample);
    fn has_launched(&self) -> bool;
    /// Session milliseconds at which the launch happened
    fn launch_time(&self) -> u32;
}

/// Picks the track the vehicle is actually on
pub trait AutoTrack {
    fn resolve(&mut self, default_track: &Track, seed: &GeoPoint) -> Track;
}

/// Decides whether a fix is good enough for timing
pub trait SignalClassifier {
    fn is_usable(&self, quality: GpsQuality) -> bool;
}

/// Cross-lap time delta prediction
pub trait PredictiveTimer {
    fn add_sample(&mut self, point: &GeoPoint, millis: u32);
    fn start_finish_crossed(&mut self, point: &GeoPoint, millis: u32);
    fn reset(&mut self);
}

/// Per-lap distance odometer
pub trait DistanceAccumulator {
    fn reset(&mut self);
    fn set_kilometers(&mut self, km: f32);
}

/// Usable iff there is a position solution
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSignalClassifier;

impl SignalClassifier for DefaultSignalClassifier {
    fn is_usable(&self, quality: GpsQuality) -> bool {
        quality != GpsQuality::NoFix
    }
}

/// Keeps the configured default track
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTrack;

impl AutoTrack for FixedTrack {
    fn resolve(&mut self, default_track: &Track, _seed: &GeoPoint) -> Track {
        *default_track
    }
}

/// Everything [`LapStats`](crate::LapStats) needs from the outside for one update
pub struct LapContext<'a> {
    pub config: &'a TrackConfig,
    pub launch_control: &'a mut dyn LaunchControl,
    pub auto_track: &'a mut dyn AutoTrack,
    pub classifier: &'a dyn SignalClassifier,
    pub predictive_timer: &'a mut dyn PredictiveTimer,
    pub distance: &'a mut dyn DistanceAccumulator,
}
