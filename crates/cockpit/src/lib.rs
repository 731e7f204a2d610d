//! # Cockpit
//!
//! Driver-facing side of a session: input devices, the control input mapper
//! with its gear/horn state machine, the HUD composer, display surfaces and
//! the horn output.

mod display;
mod error;
mod horn;
mod hud;
mod input;
mod mapper;
mod scripted;

use std::path::Path;

pub use display::{DisplaySurface, HeadlessDisplay, SnapshotOptions};
pub use error::{CockpitError, Result};
pub use horn::{HeadlessHorn, Horn};
pub use hud::{Canvas, HudComposer, HudFrame, HudStatus, TextOverlay, GREEN, WHITE, YELLOW};
pub use input::{
    Command, InputDevice, InputEvent, InputFrame, AXIS_BRAKE, AXIS_STEER, AXIS_THROTTLE,
    BUTTON_HAND_BRAKE, BUTTON_HORN, BUTTON_REVERSE,
};
pub use mapper::{apply_deadzone, pedal_from_axis, Action, ControlMapper, TickInput, DEFAULT_DEADZONE};
pub use scripted::{ScriptButton, ScriptStep, ScriptedInput};

/// Open the input device for a run
///
/// # Errors
/// `NoInputDevice` when no device is configured.
pub fn open_input_device(script: Option<&Path>) -> Result<Box<dyn InputDevice>> {
    match script {
        Some(path) => Ok(Box::new(ScriptedInput::from_path(path)?)),
        None => Err(CockpitError::NoInputDevice),
    }
}
