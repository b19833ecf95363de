//! GPS sample record consumed by the timing engine
//!
//! The receiver driver and its protocol live outside this crate; it only
//! needs the fused fix below, once per update.

use crate::geo::GeoPoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fix quality reported by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GpsQuality {
    /// No position solution
    #[default]
    NoFix,
    /// Standard 2D/3D fix
    Fix,
    /// Differential / SBAS corrected fix
    Differential,
}

/// One GPS update as delivered to [`LapStats::process_update`](crate::LapStats::process_update)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsSample {
    pub point: GeoPoint,
    pub quality: GpsQuality,
    /// Ground speed in m/s
    pub speed: f32,
    /// Milliseconds since the first reliable fix of the session.
    /// `None` while the receiver is still cold.
    pub millis_since_first_fix: Option<u32>,
}

impl GpsSample {
    pub fn new(point: GeoPoint, quality: GpsQuality, speed: f32, millis: u32) -> Self {
        Self {
            point,
            quality,
            speed,
            millis_since_first_fix: Some(millis),
        }
    }

    /// Sample received before the session had a reliable first fix
    pub fn cold(point: GeoPoint, quality: GpsQuality) -> Self {
        Self {
            point,
            quality,
            speed: 0.0,
            millis_since_first_fix: None,
        }
    }

    pub fn is_cold(&self) -> bool {
        self.millis_since_first_fix.is_none()
    }
}
