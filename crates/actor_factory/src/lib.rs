//! # Actor Factory
//!
//! CARLA asset factory module.
//!
//! Responsibilities:
//! - Spawn the ego vehicle, its cameras and collision sensor
//! - Populate the world with background vehicles and pedestrians
//! - Tear every actor down in dependency order
//! - Provide unified `SensorSource` abstraction
//! - Support a Mock simulator for tests and offline runs
//!
//! ## Feature Flags
//!
//! - `real-carla`: Enable real CARLA client (requires carla crate and libcarla)

pub mod client;
pub mod error;
pub mod factory;
pub mod mock_client;
pub mod mock_sensor;

#[cfg(feature = "real-carla")]
pub mod carla_client;
#[cfg(feature = "real-carla")]
pub mod carla_sensor_source;
#[cfg(feature = "real-carla")]
pub mod sensor_data_converter;

pub use client::{matches_filter, Attributes, CarlaClient};
pub use contracts::{ActorId, ActorRegistry, SensorSource};
pub use error::{ActorFactoryError, Result};
pub use factory::{ActorFactory, SpawnReport, TeardownReport};
pub use mock_client::{MockCarlaClient, MockConfig, MockEvent};
pub use mock_sensor::{MockSensor, MockSensorConfig};

#[cfg(feature = "real-carla")]
pub use carla_client::RealCarlaClient;
#[cfg(feature = "real-carla")]
pub use carla_sensor_source::CarlaSensorSource;
