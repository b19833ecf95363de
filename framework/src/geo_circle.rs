//! Circular geofences and boundary crossing detection
//!
//! A [`GeoCircle`] is a plain membership test. A [`GeoCircleBoundary`] wraps
//! one and watches a stream of timestamped samples for the moment the vehicle
//! passes through it, then estimates the crossing instant between GPS fixes.
//!
//! ## Detection
//!
//! ```text
//!   Idle ──(first sample inside)──▶ Recording ──(distance turns upward)──▶ Crossed
//! ```
//!
//! Once breached, every sample is kept in a 3-deep history. When the distance
//! to the centre stops shrinking and starts growing, the previous sample was
//! the closest approach and the vehicle is on its way out. `Crossed` is
//! terminal: a new episode needs a new boundary.
//!
//! ## Interpolation
//!
//! If the newest fix is already outside, the crossing is the circle exit on
//! the last segment, found with the law of cosines on the triangle (sample A,
//! sample B, centre). If the turn was seen with every fix still inside, the
//! crossing is the closest approach to the centre, i.e. the foot of the
//! perpendicular on the segment that holds it. GPS fixes arrive a few times
//! per second; interpolating gives timing resolution well below the fix
//! interval.

use libm::sqrt;

use crate::geo::{GeoPoint, TimedPoint};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A circular region: centre point and radius in meters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoCircle {
    pub center: GeoPoint,
    /// Radius in meters
    pub radius: f32,
}

impl GeoCircle {
    /// Create a circle. No validation happens here; see [`GeoCircle::is_valid`].
    pub const fn new(center: GeoPoint, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Valid iff the centre is a real point and the radius is positive
    pub fn is_valid(&self) -> bool {
        self.center.is_valid() && self.radius > 0.0
    }

    /// Closed-boundary membership test. Invalid circles contain nothing.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.is_valid() && self.distance_from_center(point) <= self.radius
    }

    /// Planar distance from the centre to `point` in meters
    pub fn distance_from_center(&self, point: &GeoPoint) -> f32 {
        self.center.distance_to(point)
    }
}

/// Detector lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryState {
    /// No sample has been inside the circle yet
    Idle,
    /// Breached, collecting samples
    Recording,
    /// Crossing detected (terminal)
    Crossed,
}

const HISTORY_LEN: usize = 3;

/// Stateful crossing detector around a [`GeoCircle`]
///
/// Cheap to build and `Copy`; create a fresh one for every detection episode.
#[derive(Debug, Clone, Copy)]
pub struct GeoCircleBoundary {
    circle: GeoCircle,
    /// Ring buffer; `samples[head]` is the newest entry
    samples: [TimedPoint; HISTORY_LEN],
    head: usize,
    breached: bool,
    /// Interpolated crossing, set exactly once when the crossing is detected
    crossing: Option<TimedPoint>,
}

impl GeoCircleBoundary {
    /// Fresh detector: not breached, not crossed, empty history
    pub fn new(circle: GeoCircle) -> Self {
        Self {
            circle,
            samples: [TimedPoint::default(); HISTORY_LEN],
            head: 0,
            breached: false,
            crossing: None,
        }
    }

    pub fn circle(&self) -> &GeoCircle {
        &self.circle
    }

    pub fn state(&self) -> BoundaryState {
        if self.crossing.is_some() {
            BoundaryState::Crossed
        } else if self.breached {
            BoundaryState::Recording
        } else {
            BoundaryState::Idle
        }
    }

    pub fn is_breached(&self) -> bool {
        self.breached
    }

    pub fn is_crossed(&self) -> bool {
        self.crossing.is_some()
    }

    /// History slot `index`, newest first (0 = newest, 2 = oldest)
    pub fn sample(&self, index: usize) -> &TimedPoint {
        &self.samples[(self.head + index) % HISTORY_LEN]
    }

    fn push(&mut self, sample: TimedPoint) {
        self.head = (self.head + HISTORY_LEN - 1) % HISTORY_LEN;
        self.samples[self.head] = sample;
    }

    fn history_full(&self) -> bool {
        self.samples.iter().all(TimedPoint::is_valid)
    }

    /// Feed one sample. Returns true once a crossing has been detected, and
    /// keeps returning true for every call after that.
    pub fn add_sample(&mut self, point: GeoPoint, millis: u32) -> bool {
        if self.crossing.is_some() {
            return true;
        }

        if !self.circle.is_valid() {
            return false;
        }

        if !self.breached && !self.circle.contains(&point) {
            return false;
        }

        self.breached = true;
        self.push(TimedPoint::new(point, millis));

        // Need three real fixes to see a turning point
        if !self.history_full() {
            return false;
        }

        let d0 = self.circle.distance_from_center(&self.sample(0).point);
        let d1 = self.circle.distance_from_center(&self.sample(1).point);

        if d1 < d0 {
            self.crossing = Some(self.interpolate_crossing());
            return true;
        }

        false
    }

    /// Estimated crossing instant and location, or the zeroed sentinel if
    /// no crossing has been detected.
    pub fn crossing_time_and_location(&self) -> TimedPoint {
        self.crossing.unwrap_or_default()
    }

    fn interpolate_crossing(&self) -> TimedPoint {
        let s0 = *self.sample(0);
        let s1 = *self.sample(1);
        let s2 = *self.sample(2);

        let d0 = self.circle.distance_from_center(&s0.point);
        let d1 = self.circle.distance_from_center(&s1.point);
        let d2 = self.circle.distance_from_center(&s2.point);

        // Noise broke the approach/depart shape around s1; the nearest raw
        // sample is the best we can offer.
        if d0 < d1 {
            return s0;
        }
        if d2 < d1 {
            return s2;
        }

        // Newest fix already outside: the exit is on the last segment.
        // Still inside: take the segment holding the closest approach, which
        // lies on the side of s1 whose outer sample is nearer the centre.
        let r = self.circle.radius;
        let (side_a, side_b) = if d0 > r || d0 < d2 {
            (s1, s0)
        } else {
            (s2, s1)
        };

        let pct = crossing_fraction(&side_a, &side_b, &self.circle);
        side_a.lerp(&side_b, pct)
    }
}

/// Fraction along A→B where the vehicle crosses the circle, clamped to [0, 1]
///
/// With `a = |A-centre|`, `b = |B-centre|`, `c = |A-B|` the law of cosines gives
/// the along-track distance from A to the foot of the perpendicular from the
/// centre, `a·cos α = (a² + c² - b²) / 2c`, and the squared perpendicular
/// offset `a² - (a·cos α)²`. The edge lies `sqrt(r² - offset²)` either side of
/// the foot: ahead of it when leaving the circle, before it when entering.
///
/// When both samples are inside, or the edge is not on the segment, the
/// vehicle is taken to pass at right angles to the centre and the foot itself
/// is used.
pub fn crossing_fraction(side_a: &TimedPoint, side_b: &TimedPoint, circle: &GeoCircle) -> f32 {
    let a = circle.distance_from_center(&side_a.point) as f64;
    let b = circle.distance_from_center(&side_b.point) as f64;
    let c = side_a.point.distance_to(&side_b.point) as f64;
    let r = circle.radius as f64;

    if c <= f64::EPSILON {
        return 0.0;
    }

    let along = (a * a + c * c - b * b) / (2.0 * c);
    let foot = (along / c).clamp(0.0, 1.0) as f32;

    if a <= r && b <= r {
        return foot;
    }

    let reach_sq = r * r - (a * a - along * along);
    if reach_sq < 0.0 {
        return foot;
    }

    let edge = if a > r {
        along - sqrt(reach_sq)
    } else {
        along + sqrt(reach_sq)
    };

    if (0.0..=c).contains(&edge) {
        (edge / c) as f32
    } else {
        foot
    }
}
