//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Concurrency Model
//! - The control loop owns the session and everything reachable from it
//! - Sensor callbacks run on simulator threads and only touch values that are
//!   `Send + Sync` (frame slots, queue senders, callback gates)

mod blueprint;
mod control;
mod error;
mod records;
mod runtime;
mod sensor;
mod sensor_source;

pub use blueprint::*;
pub use control::*;
pub use error::*;
pub use records::*;
pub use runtime::*;
pub use sensor::*;
pub use sensor_source::{CallbackGate, SensorDataCallback, SensorSource};
