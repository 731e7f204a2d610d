//! Telemetry and collision records
//!
//! Append-only rows; never mutated after they are written.

use chrono::{DateTime, Local};

use crate::{Location, Vector3};

/// Timestamp column format of both session logs
pub const LOG_TIMESTAMP_FORMAT: &str = "%H:%M:%S%.6f";

/// m/s -> km/h
pub const MPS_TO_KMH: f64 = 3.6;

/// One drive-log row, written once per control tick
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub driver: String,
    pub timestamp: DateTime<Local>,
    pub speed_kmh: f64,
    pub throttle: f64,
    pub brake: f64,
}

impl TelemetryRecord {
    /// Speed (km/h) from a velocity vector in m/s
    pub fn speed_kmh_from(velocity: Vector3) -> f64 {
        velocity.norm() * MPS_TO_KMH
    }

    /// Microseconds since the Unix epoch
    pub fn timestamp_micros(&self) -> i64 {
        self.timestamp.timestamp_micros()
    }
}

/// One collision-log row, written from the collision sensor callback
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionRecord {
    pub driver: String,
    pub timestamp: DateTime<Local>,
    pub other_actor: String,
    pub location: Location,
}

impl CollisionRecord {
    /// Microseconds since the Unix epoch
    pub fn timestamp_micros(&self) -> i64 {
        self.timestamp.timestamp_micros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_kmh_from_velocity() {
        let speed = TelemetryRecord::speed_kmh_from(Vector3::new(10.0, 0.0, 0.0));
        assert!((speed - 36.0).abs() < 1e-9);
    }
}
