//! Input device abstraction
//!
//! A device is polled once per control tick and reports the current axis and
//! button levels plus the discrete events seen since the previous poll.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Steering axis index
pub const AXIS_STEER: usize = 0;
/// Throttle pedal axis index (bipolar, +1.0 at rest)
pub const AXIS_THROTTLE: usize = 1;
/// Brake pedal axis index (bipolar, +1.0 at rest)
pub const AXIS_BRAKE: usize = 2;

/// Hand-brake button (level)
pub const BUTTON_HAND_BRAKE: usize = 0;
/// Reverse toggle button (edge)
pub const BUTTON_REVERSE: usize = 1;
/// Horn button (edge)
pub const BUTTON_HORN: usize = 2;

/// Logical commands, independent of key bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Quit,
    ToggleReverse,
    Honk,
    AdvanceWeather,
    AdvanceTown,
}

/// Discrete input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    ButtonDown(usize),
    ButtonUp(usize),
    Command(Command),
}

/// Everything read from a device in one poll
#[derive(Debug, Clone, PartialEq)]
pub struct InputFrame {
    /// Raw axis values in [-1, 1], indexed by `AXIS_*`
    pub axes: [f64; 3],
    /// Button levels, indexed by `BUTTON_*`
    pub buttons: Vec<bool>,
    /// Events in arrival order
    pub events: Vec<InputEvent>,
}

impl InputFrame {
    /// Centered wheel, both pedals released, nothing pressed
    pub fn at_rest() -> Self {
        Self {
            axes: [0.0, 1.0, 1.0],
            buttons: vec![false; 3],
            events: Vec::new(),
        }
    }

    pub fn axis(&self, index: usize) -> f64 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }
}

impl Default for InputFrame {
    fn default() -> Self {
        Self::at_rest()
    }
}

/// Polled input device
pub trait InputDevice: Send {
    /// Device name, for logs
    fn name(&self) -> &str;

    /// Read the device state for this tick
    fn poll(&mut self) -> Result<InputFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_frame() {
        let frame = InputFrame::at_rest();
        assert_eq!(frame.axis(AXIS_THROTTLE), 1.0);
        assert!(!frame.button(BUTTON_HAND_BRAKE));
        assert_eq!(frame.axis(7), 0.0);
        assert!(!frame.button(9));
    }
}
