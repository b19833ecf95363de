//! Simulates a few laps of a circuit to exercise lap and sector timing
//!
//! A car drives a 400 m radius oval at varying pace with a 5 Hz GPS that
//! wanders by a metre or two. The timing engine should report a launch, one
//! lap per circuit and three sector splits per lap, with the interpolated
//! crossing landing between fixes.
//!
//! Run with: cargo run -p lap-timing --example lap_sim

use std::f64::consts::TAU;

use lap_timing::geo::{meters_to_lat_degrees, meters_to_lon_degrees};
use lap_timing::{
    DefaultSignalClassifier, DistanceAccumulator, FixedTrack, GeoCircle, GeoCircleBoundary,
    GeoPoint, GpsQuality, GpsSample, LapContext, LapStats, LaunchControl, PredictiveTimer, Track,
    TrackConfig, LAP_STARTED, NEW_LAP, SECTOR_CROSSED, START_FINISH_REFINED,
};

const CENTER: GeoPoint = GeoPoint::new(45.6156, 9.2811);
const OVAL_RADIUS_M: f64 = 400.0;
const FIX_INTERVAL_MS: u32 = 200;

/// Simple pseudo-random noise generator (deterministic for reproducibility)
struct NoiseGen {
    state: u32,
}

impl NoiseGen {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Returns noise in range [-amplitude, +amplitude]
    fn next(&mut self, amplitude: f64) -> f64 {
        // Simple LCG
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        let normalized = (self.state as f64 / u32::MAX as f64) * 2.0 - 1.0;
        normalized * amplitude
    }
}

/// Point on the oval at `angle` radians (0 = start/finish, counter-clockwise)
fn on_oval(angle: f64, east_noise: f64, north_noise: f64) -> GeoPoint {
    let east = OVAL_RADIUS_M * angle.cos() + east_noise;
    let north = OVAL_RADIUS_M * angle.sin() + north_noise;
    GeoPoint::new(
        CENTER.latitude + meters_to_lat_degrees(north),
        CENTER.longitude + meters_to_lon_degrees(east, CENTER.latitude),
    )
}

/// Launches when the car passes through the start geofence
struct StartLineLaunch {
    boundary: Option<GeoCircleBoundary>,
    launch_time: Option<u32>,
}

impl LaunchControl for StartLineLaunch {
    fn setup(&mut self, track: &Track, radius_meters: f32) {
        self.boundary = Some(GeoCircleBoundary::new(GeoCircle::new(track.start, radius_meters)));
        self.launch_time = None;
    }

    fn supply_gps_sample(&mut self, sample: &GpsSample) {
        let (Some(boundary), Some(millis)) =
            (self.boundary.as_mut(), sample.millis_since_first_fix)
        else {
            return;
        };
        if self.launch_time.is_none() && boundary.add_sample(sample.point, millis) {
            self.launch_time = Some(boundary.crossing_time_and_location().millis);
        }
    }

    fn has_launched(&self) -> bool {
        self.launch_time.is_some()
    }

    fn launch_time(&self) -> u32 {
        self.launch_time.unwrap_or(0)
    }
}

/// Counts line crossings; stands in for the real delta predictor
#[derive(Default)]
struct CrossingCounter {
    crossings: u32,
}

impl PredictiveTimer for CrossingCounter {
    fn add_sample(&mut self, _point: &GeoPoint, _millis: u32) {}

    fn start_finish_crossed(&mut self, _point: &GeoPoint, _millis: u32) {
        self.crossings += 1;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Default)]
struct Odometer {
    km: f32,
}

impl DistanceAccumulator for Odometer {
    fn reset(&mut self) {
        self.km = 0.0;
    }

    fn set_kilometers(&mut self, km: f32) {
        self.km = km;
    }
}

fn main() {
    let track = Track::circuit(
        on_oval(0.0, 0.0, 0.0),
        &[
            on_oval(TAU * 0.25, 0.0, 0.0),
            on_oval(TAU * 0.5, 0.0, 0.0),
            on_oval(TAU * 0.75, 0.0, 0.0),
        ],
    );
    let config = TrackConfig::new(track);

    let mut launch = StartLineLaunch {
        boundary: None,
        launch_time: None,
    };
    let mut auto_track = FixedTrack;
    let mut timer = CrossingCounter::default();
    let mut odometer = Odometer::default();
    let mut noise = NoiseGen::new(42);

    let mut stats = LapStats::new();
    stats.start_session(&mut timer);

    println!("=== Lap Timing Simulation ===\n");
    println!(
        "Oval: {:.0} m radius, {} sectors, geofence {:.1} m, GPS {} Hz\n",
        OVAL_RADIUS_M,
        track.sector_count(),
        config.radius_meters(),
        1000 / FIX_INTERVAL_MS
    );

    // Per-lap pace in m/s; the grid slot is 60 m before the line
    let paces = [38.0, 41.5, 40.0, 43.0];
    let circumference = TAU * OVAL_RADIUS_M;
    let mut angle = -60.0 / OVAL_RADIUS_M;
    let mut millis = 0u32;
    let mut speed = 0.0f64;

    let total_angle = TAU * paces.len() as f64 + 0.5;
    while angle < total_angle {
        let lap = (angle.max(0.0) / TAU) as usize;
        let target = paces[lap.min(paces.len() - 1)];
        // Rolling start: build up to pace
        speed = (speed + 4.0 * FIX_INTERVAL_MS as f64 / 1000.0).min(target);
        angle += speed * FIX_INTERVAL_MS as f64 / 1000.0 / OVAL_RADIUS_M;
        odometer.km += (speed * FIX_INTERVAL_MS as f64 / 1_000_000.0) as f32;
        millis += FIX_INTERVAL_MS;

        let point = on_oval(angle, noise.next(1.5), noise.next(1.5));
        let sample = GpsSample::new(point, GpsQuality::Fix, speed as f32, millis);

        let mut ctx = LapContext {
            config: &config,
            launch_control: &mut launch,
            auto_track: &mut auto_track,
            classifier: &DefaultSignalClassifier,
            predictive_timer: &mut timer,
            distance: &mut odometer,
        };
        let flags = stats.process_update(&sample, &mut ctx);

        let t = millis as f32 / 1000.0;
        if flags & LAP_STARTED != 0 {
            println!(
                "  t={:6.1}s: LAUNCH at {:.2}s, odometer seeded with {:.1} m",
                t,
                stats.last_start_finish_ms() as f32 / 1000.0,
                odometer.km * 1000.0
            );
        }
        if flags & SECTOR_CROSSED != 0 {
            println!(
                "  t={:6.1}s:   sector {} split {:.2}s",
                t,
                stats.last_sector().unwrap_or(0),
                stats.last_sector_ms() as f32 / 1000.0
            );
        }
        if flags & NEW_LAP != 0 {
            println!(
                "  t={:6.1}s: LAP {} {:.3}s ({:.3} min), line crossing #{}",
                t,
                stats.lap_count(),
                stats.last_lap_ms() as f32 / 1000.0,
                stats.last_lap_minutes(),
                timer.crossings
            );
        }
        if flags & START_FINISH_REFINED != 0 {
            if let Some(refined) = stats.refined_start_finish_crossing() {
                println!(
                    "  t={:6.1}s:   line crossing refined to {:.3}s",
                    t,
                    refined.millis as f32 / 1000.0
                );
            }
        }
    }

    println!("\n=== Summary ===");
    println!(
        "  Laps: {} (expected {}), ideal lap at pace: {:.1}s",
        stats.lap_count(),
        paces.len(),
        circumference / paces[1]
    );
    println!("  State: {:?}", stats.state());
}
