//! Drive orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{Drive, DriveConfig};
pub use stats::{CameraTotals, DriveStats};
