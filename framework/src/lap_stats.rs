//! Lap and sector timing state machine
//!
//! Consumes one GPS fix per update and turns geofence entries into lap counts,
//! lap times and sector splits.
//!
//! ## Flow per update
//!
//! ```text
//! fix ─▶ usable? ─▶ configure once ─▶ start/finish enabled?
//!                                        │
//!            ┌───────────────────────────┘
//!            ▼
//!   not started: Launch Control decides the first start
//!   started:     rising edge into finish geofence + 10s dwell ─▶ NEW_LAP
//!            │
//!            ▼
//!   predictive timer sample ─▶ sector waypoint geofence (rising edge) ─▶ SECTOR_CROSSED
//! ```
//!
//! The session object is owned by the caller and updated from a single task.
//! External services are passed in per update through [`LapContext`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut stats = LapStats::new();
//! stats.start_session(&mut predictive_timer);
//!
//! // For every GPS fix:
//! let mut ctx = LapContext { config: &track_config, /* collaborators */ };
//! let flags = stats.process_update(&sample, &mut ctx);
//! if flags & NEW_LAP != 0 {
//!     // stats.lap_count(), stats.last_lap_ms()
//! }
//! ```

use crate::collaborators::{LapContext, PredictiveTimer};
use crate::geo::{elapsed_ms, GeoPoint, TimedPoint};
use crate::geo_circle::{GeoCircle, GeoCircleBoundary};
use crate::gps::GpsSample;
use crate::track::Track;

/// Session state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LapStatsState {
    /// Waiting for the first usable fix to resolve the track
    Unconfigured,
    /// Track has no valid start/finish; nothing to time
    Disabled,
    /// Track configured, waiting for Launch Control to report the first start
    Armed,
    /// Start crossed, counting laps and sectors
    Timing,
}

// Per-update flag bits
/// Nothing happened this update
pub const FLAG_NONE: u8 = 0;
/// First start of the session (from Launch Control)
pub const LAP_STARTED: u8 = 1 << 0;
/// Start/finish crossed, lap completed
pub const NEW_LAP: u8 = 1 << 1;
/// Sector waypoint reached
pub const SECTOR_CROSSED: u8 = 1 << 2;
/// Interpolated start/finish crossing now available
pub const START_FINISH_REFINED: u8 = 1 << 3;
/// Interpolated sector crossing now available
pub const SECTOR_REFINED: u8 = 1 << 4;

/// Minimum time between start/finish crossings (milliseconds)
pub const START_FINISH_DWELL_MS: u32 = 10_000;

/// One geofence watched with a rising-edge trigger, plus the optional
/// boundary detector refining the most recent trigger
#[derive(Debug, Clone, Copy, Default)]
struct GeofenceTrigger {
    at: bool,
    prev_at: bool,
    last_timestamp: u32,
    /// Raw event: the sample that fired the trigger
    last_event: Option<TimedPoint>,
    /// Episode detector, alive from a trigger until it reports a crossing
    boundary: Option<GeoCircleBoundary>,
    refined: Option<TimedPoint>,
}

impl GeofenceTrigger {
    /// Update the inside flags; true on a rising edge
    fn test(&mut self, circle: &GeoCircle, point: &GeoPoint) -> bool {
        self.at = circle.contains(point);
        let rising = self.at && !self.prev_at;
        self.prev_at = self.at;
        rising
    }

    /// Start a fresh refinement episode seeded with the triggering sample
    fn begin_episode(&mut self, circle: GeoCircle, point: GeoPoint, millis: u32) {
        let mut boundary = GeoCircleBoundary::new(circle);
        boundary.add_sample(point, millis);
        self.boundary = Some(boundary);
    }

    /// Feed the running episode; true when it just produced a crossing
    fn refine(&mut self, point: GeoPoint, millis: u32) -> bool {
        let Some(boundary) = self.boundary.as_mut() else {
            return false;
        };
        if !boundary.add_sample(point, millis) {
            return false;
        }
        self.refined = Some(boundary.crossing_time_and_location());
        self.boundary = None;
        true
    }

    /// Forget geofence state; keeps timestamps
    fn tear_down(&mut self) {
        self.at = false;
        self.prev_at = false;
        self.boundary = None;
    }
}

/// Lap/sector timing session
#[derive(Debug, Clone)]
pub struct LapStats {
    configured: bool,
    start_finish_enabled: bool,
    sector_enabled: bool,
    started: bool,
    track: Track,
    radius_m: f32,

    start_finish: GeofenceTrigger,
    sector_trigger: GeofenceTrigger,

    sector: Option<usize>,
    last_sector: Option<usize>,

    lap_count: u32,
    last_lap_ms: u32,
    last_sector_ms: u32,
}

impl LapStats {
    /// Fresh session: no track, no laps, no sector
    pub fn new() -> Self {
        Self {
            configured: false,
            start_finish_enabled: false,
            sector_enabled: false,
            started: false,
            track: Track::default(),
            radius_m: 0.0,
            start_finish: GeofenceTrigger::default(),
            sector_trigger: GeofenceTrigger::default(),
            sector: None,
            last_sector: None,
            lap_count: 0,
            last_lap_ms: 0,
            last_sector_ms: 0,
        }
    }

    /// Zero every counter and timestamp, drop detectors, forget the track
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Reset and clear the predictive timer; call at the start of logging
    pub fn start_session(&mut self, predictive_timer: &mut dyn PredictiveTimer) {
        self.reset();
        predictive_timer.reset();
    }

    /// Zero the lap counter only
    pub fn reset_lap_count(&mut self) {
        self.lap_count = 0;
    }

    /// Track configuration changed; re-resolve on the next usable fix
    pub fn config_changed(&mut self) {
        self.configured = false;
    }

    /// Process one GPS update. Returns the flags raised by this update.
    pub fn process_update(&mut self, sample: &GpsSample, ctx: &mut LapContext<'_>) -> u8 {
        // Cold receiver or no usable signal: nothing to do
        let Some(millis) = sample.millis_since_first_fix else {
            return FLAG_NONE;
        };
        if !ctx.classifier.is_usable(sample.quality) {
            return FLAG_NONE;
        }

        let point = sample.point;

        if !self.configured {
            self.configure(&point, ctx);
        }

        if !self.start_finish_enabled {
            return FLAG_NONE;
        }

        let mut flags = self.process_start_finish(sample, millis, ctx);
        if flags & (LAP_STARTED | NEW_LAP) != 0 {
            self.notify_start_finish(&point, millis, ctx);
        }

        ctx.predictive_timer.add_sample(&point, millis);

        if self.sector_enabled {
            flags |= self.process_sector(&point, millis);
        }

        flags
    }

    fn configure(&mut self, point: &GeoPoint, ctx: &mut LapContext<'_>) {
        let config = ctx.config;

        self.track = if config.auto_detect {
            ctx.auto_track.resolve(&config.track, point)
        } else {
            config.track
        };
        self.radius_m = config.radius_meters();

        self.start_finish_enabled = self.track.is_start_valid() && self.track.is_finish_valid();
        self.sector_enabled = config.sector_timing
            && self.start_finish_enabled
            && self.track.sector_point(0).is_valid();

        // New track: every geofence episode starts over
        self.start_finish.tear_down();
        self.sector_trigger.tear_down();

        ctx.launch_control.setup(&self.track, self.radius_m);
        self.configured = true;

        if self.start_finish_enabled {
            info!(
                "Track configured: finish ({:.6}, {:.6}), radius {:.1}m, {} sectors",
                self.track.finish.latitude,
                self.track.finish.longitude,
                self.radius_m,
                if self.sector_enabled { self.track.sector_count() } else { 0 }
            );
        } else {
            warn!("Track has no valid start/finish; lap timing disabled");
        }
    }

    /// Start/finish flags for this update: launch, lap and refinement
    fn process_start_finish(
        &mut self,
        sample: &GpsSample,
        millis: u32,
        ctx: &mut LapContext<'_>,
    ) -> u8 {
        // First start of the session belongs to Launch Control
        if !self.started {
            ctx.launch_control.supply_gps_sample(sample);
            if !ctx.launch_control.has_launched() {
                return FLAG_NONE;
            }

            let launch = ctx.launch_control.launch_time();
            self.start_finish.last_timestamp = launch;
            self.sector_trigger.last_timestamp = launch;
            self.start_finish.prev_at = true;
            self.sector = Some(0);
            self.started = true;
            debug!("Launch detected at {}ms", launch);
            return LAP_STARTED;
        }

        let point = sample.point;
        let mut flags = FLAG_NONE;

        if self.start_finish.refine(point, millis) {
            flags |= START_FINISH_REFINED;
        }

        let circle = GeoCircle::new(self.track.finish, self.radius_m);
        let elapsed = elapsed_ms(millis, self.start_finish.last_timestamp);

        // Rising edge only, and not again until the dwell time has passed
        if !self.start_finish.test(&circle, &point) || elapsed <= START_FINISH_DWELL_MS {
            return flags;
        }

        self.lap_count += 1;
        self.last_lap_ms = elapsed;
        self.start_finish.last_timestamp = millis;
        self.start_finish.begin_episode(circle, point, millis);
        debug!("Lap {} detected: {}ms", self.lap_count, elapsed);

        flags | NEW_LAP
    }

    fn notify_start_finish(&mut self, point: &GeoPoint, millis: u32, ctx: &mut LapContext<'_>) {
        ctx.distance.reset();

        // The launch fires late and away from the line: report the nominal
        // start point and seed the odometer with the distance already covered
        let event = if self.lap_count == 0 {
            let start = self.track.start;
            ctx.distance.set_kilometers(start.distance_to(point) / 1000.0);
            TimedPoint::new(start, self.start_finish.last_timestamp)
        } else {
            TimedPoint::new(*point, millis)
        };

        ctx.predictive_timer.start_finish_crossed(&event.point, event.millis);
        self.start_finish.last_event = Some(event);
    }

    /// Sector flags for this update: boundary and refinement
    fn process_sector(&mut self, point: &GeoPoint, millis: u32) -> u8 {
        if !self.started {
            return FLAG_NONE;
        }

        let mut flags = FLAG_NONE;

        if self.sector_trigger.refine(*point, millis) {
            flags |= SECTOR_REFINED;
        }

        let Some(index) = self.sector else {
            return flags;
        };

        let waypoint = self.track.sector_point(index);
        let circle = GeoCircle::new(waypoint, self.radius_m);

        if !self.sector_trigger.test(&circle, point) {
            return flags;
        }

        self.last_sector_ms = elapsed_ms(millis, self.sector_trigger.last_timestamp);
        self.sector_trigger.last_timestamp = millis;
        self.sector_trigger.last_event = Some(TimedPoint::new(*point, millis));
        self.sector_trigger.begin_episode(circle, *point, millis);
        self.last_sector = Some(index);

        // Next waypoint equal to the first marks the end of the list
        let next = index + 1;
        self.sector = if self.track.sector_point(next) == self.track.sector_point(0) {
            Some(0)
        } else {
            Some(next)
        };

        debug!("Sector {} boundary: {}ms", index, self.last_sector_ms);

        flags | SECTOR_CROSSED
    }

    pub fn state(&self) -> LapStatsState {
        if !self.configured {
            LapStatsState::Unconfigured
        } else if !self.start_finish_enabled {
            LapStatsState::Disabled
        } else if !self.started {
            LapStatsState::Armed
        } else {
            LapStatsState::Timing
        }
    }

    /// Active track, once resolved
    pub fn track(&self) -> Option<&Track> {
        self.configured.then_some(&self.track)
    }

    /// Geofence radius in meters used for the active track
    pub fn radius_meters(&self) -> f32 {
        self.radius_m
    }

    pub fn is_start_finish_enabled(&self) -> bool {
        self.start_finish_enabled
    }

    pub fn is_sector_enabled(&self) -> bool {
        self.sector_enabled
    }

    /// Completed laps
    pub fn lap_count(&self) -> u32 {
        self.lap_count
    }

    pub fn last_lap_ms(&self) -> u32 {
        self.last_lap_ms
    }

    pub fn last_lap_minutes(&self) -> f32 {
        self.last_lap_ms as f32 / 60_000.0
    }

    pub fn last_sector_ms(&self) -> u32 {
        self.last_sector_ms
    }

    pub fn last_sector_minutes(&self) -> f32 {
        self.last_sector_ms as f32 / 60_000.0
    }

    /// Sector currently being driven; `None` before the first start
    pub fn sector(&self) -> Option<usize> {
        self.sector
    }

    /// Sector most recently completed; `None` if none yet
    pub fn last_sector(&self) -> Option<usize> {
        self.last_sector
    }

    pub fn is_at_start_finish(&self) -> bool {
        self.start_finish.at
    }

    pub fn is_at_sector(&self) -> bool {
        self.sector_trigger.at
    }

    /// Session time of the last start/finish event (launch or lap)
    pub fn last_start_finish_ms(&self) -> u32 {
        self.start_finish.last_timestamp
    }

    /// Session time of the last sector boundary (or the launch)
    pub fn last_sector_timestamp_ms(&self) -> u32 {
        self.sector_trigger.last_timestamp
    }

    /// Point and time reported for the last start/finish event
    pub fn last_start_finish_crossing(&self) -> Option<TimedPoint> {
        self.start_finish.last_event
    }

    /// Point and time of the sample that triggered the last sector boundary
    pub fn last_sector_crossing(&self) -> Option<TimedPoint> {
        self.sector_trigger.last_event
    }

    /// Interpolated crossing of the last lap's start/finish pass
    pub fn refined_start_finish_crossing(&self) -> Option<TimedPoint> {
        self.start_finish.refined
    }

    /// Interpolated crossing of the last sector waypoint pass
    pub fn refined_sector_crossing(&self) -> Option<TimedPoint> {
        self.sector_trigger.refined
    }
}

impl Default for LapStats {
    fn default() -> Self {
        Self::new()
    }
}
