//! Geographic positions and interpolation.
//!
//! The client renders trucks at interpolated positions between two
//! authoritative points so movement appears continuous. Interpolation
//! is plain linear blending in degree space; at the distances a truck
//! travels between bins the curvature error is far below marker
//! resolution.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

impl GeoPoint {
    /// Create a position from latitude and longitude.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Linearly interpolate between `self` and `other`.
    ///
    /// `t` is clamped to `[0, 1]`. `t = 0` returns `self`; `t >= 1`
    /// returns `other` exactly (no floating-point residue at the
    /// destination, so a finished animation lands on the authoritative
    /// position bit-for-bit).
    pub const fn lerp(self, other: Self, t: f64) -> Self {
        if t <= 0.0 {
            return self;
        }
        if t >= 1.0 {
            return other;
        }
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }
}
