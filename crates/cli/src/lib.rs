//! # CARLA Cockpit
//!
//! Drive loop behind the `carla-cockpit` binary.
//!
//! Wires an input device, the simulator session manager, the HUD composer and
//! a display surface into one fixed-rate control loop:
//!
//! ```ignore
//! let drive = Drive::new(config, client, input, display);
//! let stats = drive.run(shutdown_signal()).await?;
//! stats.print_summary();
//! ```

pub mod drive;
pub mod error;

pub use drive::{CameraTotals, Drive, DriveConfig, DriveStats};
pub use error::{DriveError, Result};
