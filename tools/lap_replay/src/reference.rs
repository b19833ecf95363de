//! Host-side stand-ins for the logger services the timing engine calls out to

use lap_timing::{
    DistanceAccumulator, GeoCircle, GeoCircleBoundary, GeoPoint, GpsSample, LaunchControl,
    PredictiveTimer, TimedPoint, Track,
};
use log::debug;

/// Launches on the first pass through the start geofence at or above a
/// minimum speed. The launch time is the interpolated crossing.
pub struct StartLineLaunch {
    min_speed: f32,
    boundary: Option<GeoCircleBoundary>,
    launch: Option<TimedPoint>,
}

impl StartLineLaunch {
    pub fn new(min_speed: f32) -> Self {
        Self {
            min_speed,
            boundary: None,
            launch: None,
        }
    }
}

impl LaunchControl for StartLineLaunch {
    fn setup(&mut self, track: &Track, radius_meters: f32) {
        self.boundary = Some(GeoCircleBoundary::new(GeoCircle::new(track.start, radius_meters)));
        self.launch = None;
    }

    fn supply_gps_sample(&mut self, sample: &GpsSample) {
        if self.launch.is_some() {
            return;
        }
        let (Some(boundary), Some(millis)) =
            (self.boundary.as_mut(), sample.millis_since_first_fix)
        else {
            return;
        };

        if !boundary.add_sample(sample.point, millis) {
            return;
        }

        let crossing = boundary.crossing_time_and_location();
        if sample.speed >= self.min_speed {
            debug!("Launch at {}ms, {:.1} m/s", crossing.millis, sample.speed);
            self.launch = Some(crossing);
        } else {
            // Rolled through too slowly (pit lane, grid shuffle); wait for the next pass
            let circle = *boundary.circle();
            *boundary = GeoCircleBoundary::new(circle);
        }
    }

    fn has_launched(&self) -> bool {
        self.launch.is_some()
    }

    fn launch_time(&self) -> u32 {
        self.launch.map(|l| l.millis).unwrap_or(0)
    }
}

/// Keeps every start/finish crossing reported by the engine
#[derive(Debug, Default)]
pub struct CrossingLog {
    pub crossings: Vec<TimedPoint>,
}

impl PredictiveTimer for CrossingLog {
    fn add_sample(&mut self, _point: &GeoPoint, _millis: u32) {}

    fn start_finish_crossed(&mut self, point: &GeoPoint, millis: u32) {
        self.crossings.push(TimedPoint::new(*point, millis));
    }

    fn reset(&mut self) {
        self.crossings.clear();
    }
}

/// Per-lap distance, advanced by the replay loop between fixes
#[derive(Debug, Default)]
pub struct Odometer {
    pub km: f32,
    last: Option<GeoPoint>,
}

impl Odometer {
    pub fn advance(&mut self, point: &GeoPoint) {
        if let Some(last) = self.last {
            self.km += last.distance_to(point) / 1000.0;
        }
        self.last = Some(*point);
    }
}

impl DistanceAccumulator for Odometer {
    fn reset(&mut self) {
        self.km = 0.0;
    }

    fn set_kilometers(&mut self, km: f32) {
        self.km = km;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lap_timing::geo::{meters_to_lat_degrees, meters_to_lon_degrees};
    use lap_timing::GpsQuality;

    const START: GeoPoint = GeoPoint::new(45.6156, 9.2811);

    fn east_of_start(meters: f64) -> GeoPoint {
        GeoPoint::new(
            START.latitude + meters_to_lat_degrees(1.0),
            START.longitude + meters_to_lon_degrees(meters, START.latitude),
        )
    }

    fn drive_through(launch: &mut StartLineLaunch, speed: f32, t0: u32) {
        for (i, x) in [-30.0, -10.0, 6.0, 24.0].iter().enumerate() {
            let sample = GpsSample::new(east_of_start(*x), GpsQuality::Fix, speed, t0 + i as u32 * 200);
            launch.supply_gps_sample(&sample);
        }
    }

    #[test]
    fn test_launch_on_start_line_pass() {
        let mut launch = StartLineLaunch::new(5.0);
        launch.setup(&Track::circuit(START, &[]), 15.0);
        assert!(!launch.has_launched());

        drive_through(&mut launch, 20.0, 1_000);

        assert!(launch.has_launched());
        let t = launch.launch_time();
        assert!((1_400..=1_600).contains(&t), "got {}", t);
    }

    #[test]
    fn test_slow_pass_does_not_launch() {
        let mut launch = StartLineLaunch::new(5.0);
        launch.setup(&Track::circuit(START, &[]), 15.0);

        drive_through(&mut launch, 2.0, 1_000);
        assert!(!launch.has_launched());

        drive_through(&mut launch, 20.0, 60_000);
        assert!(launch.has_launched());
        assert!(launch.launch_time() >= 60_000);
    }

    #[test]
    fn test_odometer_accumulates_and_resets() {
        let mut odo = Odometer::default();
        odo.advance(&east_of_start(0.0));
        odo.advance(&east_of_start(500.0));
        assert!((odo.km - 0.5).abs() < 1e-3, "got {}", odo.km);

        odo.reset();
        assert_eq!(odo.km, 0.0);
        odo.advance(&east_of_start(1_000.0));
        assert!((odo.km - 0.5).abs() < 1e-3);
    }
}
