//! Lap Timing Engine
//!
//! Geofence-based lap and sector timing for GPS data loggers. Feed it one fix
//! at a time and it counts laps, times sectors and reports start/finish
//! crossings to the rest of the logger.
//!
//! ## Features
//!
//! - **Circuits and stages**: shared or separate start and finish points
//! - **Sector splits**: up to 20 ordered waypoints per track
//! - **Debounced start/finish**: rising-edge geofence with a 10 s dwell window
//! - **Interpolated crossings**: sub-sample crossing time from three fixes
//! - **No-std Compatible**: runs on the logger MCU, no allocation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  LapStats (session state machine)       │
//! ├─────────────────────────────────────────┤
//! │  GeoCircle / GeoCircleBoundary          │
//! ├─────────────────────────────────────────┤
//! │  GeoPoint / TimedPoint (planar geometry)│
//! └─────────────────────────────────────────┘
//!        ▲ LapContext: launch control, auto-track,
//!          predictive timer, odometer, signal classifier
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use lap_timing::{LapContext, LapStats, NEW_LAP, SECTOR_CROSSED};
//!
//! let mut stats = LapStats::new();
//! stats.start_session(&mut predictive_timer);
//!
//! loop {
//!     let sample = gps.next_sample();
//!     let mut ctx = LapContext {
//!         config: &track_config,
//!         launch_control: &mut launch,
//!         auto_track: &mut auto_track,
//!         classifier: &classifier,
//!         predictive_timer: &mut predictive_timer,
//!         distance: &mut odometer,
//!     };
//!
//!     let flags = stats.process_update(&sample, &mut ctx);
//!     if flags & NEW_LAP != 0 {
//!         // stats.lap_count(), stats.last_lap_ms()
//!     }
//!     if flags & SECTOR_CROSSED != 0 {
//!         // stats.last_sector(), stats.last_sector_ms()
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`geo`] - Points, timestamps and planar distance
//! - [`gps`] - GPS sample as delivered by the receiver
//! - [`geo_circle`] - Geofences and boundary crossing detection
//! - [`track`] - Track definition and timing configuration
//! - [`collaborators`] - Services the engine calls out to
//! - [`lap_stats`] - Lap and sector timing state machine

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod macros;

pub mod collaborators;
pub mod geo;
pub mod geo_circle;
pub mod gps;
pub mod lap_stats;
pub mod track;

// Re-export commonly used types
pub use collaborators::{
    AutoTrack, DefaultSignalClassifier, DistanceAccumulator, FixedTrack, LapContext,
    LaunchControl, PredictiveTimer, SignalClassifier,
};
pub use geo::{GeoPoint, TimedPoint};
pub use geo_circle::{BoundaryState, GeoCircle, GeoCircleBoundary};
pub use gps::{GpsQuality, GpsSample};
pub use lap_stats::{
    LapStats, LapStatsState, FLAG_NONE, LAP_STARTED, NEW_LAP, SECTOR_CROSSED, SECTOR_REFINED,
    START_FINISH_DWELL_MS, START_FINISH_REFINED,
};
pub use track::{Track, TrackConfig, MAX_SECTORS};
