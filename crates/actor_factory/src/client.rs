//! CARLA client abstraction
//!
//! Defines traits for interacting with CARLA, supporting real implementation and mock testing.
//! The set of operations is deliberately small: connect, map loading, spawn
//! points, blueprint lookup, spawn/destroy, vehicle control and state, weather,
//! navigation sampling, walker AI controllers and sensor sources.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use contracts::{
    ActorId, Location, SensorKind, SensorSource, Transform, Vector3, VehicleControl, WeatherParams,
};

use crate::error::Result;

/// Blueprint attributes passed at spawn time
pub type Attributes = HashMap<String, String>;

/// CARLA client trait
///
/// Abstracts CARLA core operations for testing and future implementation replacement.
/// Supports unified interface for real CARLA client and Mock client.
pub trait CarlaClient: Send + Sync {
    /// Connect to CARLA server
    ///
    /// Fails with `ConnectionFailed` if the server does not answer within `timeout`.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Load a map, replacing the current world
    fn load_map(&self, map: &str) -> impl Future<Output = Result<()>> + Send;

    /// Recommended spawn points of the current map
    fn spawn_points(&self) -> impl Future<Output = Result<Vec<Transform>>> + Send;

    /// Blueprint ids matching a wildcard filter (e.g. "vehicle.*")
    fn blueprints(&self, filter: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Try to spawn an actor
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "vehicle.tesla.model3"
    /// * `transform` - World pose, or pose relative to `parent`
    /// * `attributes` - Blueprint attributes
    /// * `parent` - Actor to attach to
    ///
    /// # Returns
    /// `None` when the spawn location is occupied. Errors are reserved for
    /// unknown blueprints, missing parents and connection loss.
    fn try_spawn_actor(
        &self,
        blueprint: &str,
        transform: Transform,
        attributes: &Attributes,
        parent: Option<ActorId>,
    ) -> impl Future<Output = Result<Option<ActorId>>> + Send;

    /// Destroy actor
    ///
    /// Idempotent operation: returns Ok if actor doesn't exist
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Enable or disable traffic-manager autopilot on a vehicle
    fn set_autopilot(
        &self,
        actor_id: ActorId,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Apply a control record to a vehicle
    fn apply_control(
        &self,
        actor_id: ActorId,
        control: VehicleControl,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Current velocity (m/s)
    fn velocity(&self, actor_id: ActorId) -> impl Future<Output = Result<Vector3>> + Send;

    /// Current world location
    fn location(&self, actor_id: ActorId) -> impl Future<Output = Result<Location>> + Send;

    /// Set world weather
    fn set_weather(&self, weather: WeatherParams) -> impl Future<Output = Result<()>> + Send;

    /// Sample a random navigable location (sidewalks, crossings)
    ///
    /// `None` when the navigation mesh yields no point.
    fn random_navigable_location(&self) -> impl Future<Output = Result<Option<Location>>> + Send;

    /// Start a walker AI controller towards `target` at `max_speed` (m/s)
    fn start_walker_controller(
        &self,
        controller: ActorId,
        target: Location,
        max_speed: f64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Stop a walker AI controller
    fn stop_walker_controller(&self, controller: ActorId)
        -> impl Future<Output = Result<()>> + Send;

    /// Get sensor data source
    ///
    /// Returns an object implementing `SensorSource`, usable by the capture
    /// pipeline and the collision logger.
    /// This is the core interface for unifying Mock and Real sensors.
    ///
    /// # Arguments
    /// * `actor_id` - Sensor's actor ID
    /// * `sensor_id` - Sensor configuration ID (for logging and tracing)
    /// * `kind` - Sensor kind
    ///
    /// # Returns
    /// Boxed trait object implementing `SensorSource`, None if actor doesn't exist
    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>>;
}

/// Match a blueprint id against a CARLA-style wildcard filter
///
/// `*` matches any run of characters; anything else matches literally.
pub fn matches_filter(filter: &str, id: &str) -> bool {
    fn go(pattern: &[u8], text: &[u8]) -> bool {
        match pattern.split_first() {
            None => text.is_empty(),
            Some((b'*', rest)) => (0..=text.len()).any(|skip| go(rest, &text[skip..])),
            Some((c, rest)) => text.first() == Some(c) && go(rest, &text[1..]),
        }
    }
    go(filter.as_bytes(), id.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_filter() {
        assert!(matches_filter("vehicle.*", "vehicle.tesla.model3"));
        assert!(matches_filter("walker.pedestrian.*", "walker.pedestrian.0001"));
        assert!(matches_filter("*", "static.pole"));
        assert!(matches_filter("vehicle.tesla.model3", "vehicle.tesla.model3"));
        assert!(!matches_filter("vehicle.*", "walker.pedestrian.0001"));
        assert!(!matches_filter("vehicle.tesla.model3", "vehicle.tesla.cybertruck"));
    }
}
