//! Scripted input device
//!
//! Replays a TOML drive script, one step per block of ticks:
//!
//! ```toml
//! [[step]]
//! ticks = 120
//! throttle = 0.6
//! steer = -0.2
//!
//! [[step]]
//! ticks = 1
//! press = ["reverse"]
//! commands = ["advance_weather"]
//! ```
//!
//! Pressed buttons go down on the first tick of their step and up on the
//! last. When the script runs out the device sends `Quit` once (unless
//! `quit_at_end = false`) and then reports a device at rest.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{CockpitError, Result};
use crate::input::{
    Command, InputDevice, InputEvent, InputFrame, AXIS_BRAKE, AXIS_STEER, AXIS_THROTTLE,
    BUTTON_HAND_BRAKE, BUTTON_HORN, BUTTON_REVERSE,
};

/// Buttons a script can press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptButton {
    Reverse,
    Horn,
}

impl ScriptButton {
    fn index(self) -> usize {
        match self {
            ScriptButton::Reverse => BUTTON_REVERSE,
            ScriptButton::Horn => BUTTON_HORN,
        }
    }
}

/// One block of ticks with constant axes
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptStep {
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default)]
    pub steer: f64,
    /// Throttle pedal in [0, 1]; overrides `throttle_axis`
    #[serde(default)]
    pub throttle: Option<f64>,
    /// Brake pedal in [0, 1]; overrides `brake_axis`
    #[serde(default)]
    pub brake: Option<f64>,
    /// Raw bipolar throttle axis
    #[serde(default = "axis_at_rest")]
    pub throttle_axis: f64,
    /// Raw bipolar brake axis
    #[serde(default = "axis_at_rest")]
    pub brake_axis: f64,
    #[serde(default)]
    pub hand_brake: bool,
    #[serde(default)]
    pub press: Vec<ScriptButton>,
    #[serde(default)]
    pub commands: Vec<Command>,
}

fn default_ticks() -> u64 {
    1
}

fn axis_at_rest() -> f64 {
    1.0
}

fn default_quit_at_end() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptFile {
    #[serde(default = "default_quit_at_end")]
    quit_at_end: bool,
    #[serde(default, rename = "step")]
    steps: Vec<ScriptStep>,
}

/// Pedal value in [0, 1] to the bipolar axis that produces it
fn axis_from_pedal(pedal: f64) -> f64 {
    1.0 - 2.0 * pedal.clamp(0.0, 1.0)
}

/// [`InputDevice`] replaying a drive script
pub struct ScriptedInput {
    name: String,
    steps: Vec<ScriptStep>,
    quit_at_end: bool,
    step: usize,
    tick_in_step: u64,
    quit_sent: bool,
}

impl ScriptedInput {
    /// Load a script file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CockpitError::script(path, e.to_string()))?;
        let mut input = Self::from_toml(&content).map_err(|e| match e {
            CockpitError::Script { message, .. } => CockpitError::script(path, message),
            other => other,
        })?;
        input.name = format!("script:{}", path.display());
        Ok(input)
    }

    /// Parse a script from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ScriptFile =
            toml::from_str(content).map_err(|e| CockpitError::script("<inline>", e.to_string()))?;
        Ok(Self::new(file.steps, file.quit_at_end))
    }

    pub fn new(steps: Vec<ScriptStep>, quit_at_end: bool) -> Self {
        let steps: Vec<ScriptStep> = steps.into_iter().filter(|s| s.ticks > 0).collect();
        let total: u64 = steps.iter().map(|s| s.ticks).sum();
        debug!(steps = steps.len(), total_ticks = total, "input script loaded");
        Self {
            name: "script".to_string(),
            steps,
            quit_at_end,
            step: 0,
            tick_in_step: 0,
            quit_sent: false,
        }
    }

    /// Ticks left before the script runs out
    pub fn remaining_ticks(&self) -> u64 {
        self.steps
            .iter()
            .skip(self.step)
            .map(|s| s.ticks)
            .sum::<u64>()
            .saturating_sub(self.tick_in_step)
    }

    fn frame_for_step(step: &ScriptStep, tick: u64) -> InputFrame {
        let mut frame = InputFrame::at_rest();
        frame.axes[AXIS_STEER] = step.steer;
        frame.axes[AXIS_THROTTLE] = step.throttle.map_or(step.throttle_axis, axis_from_pedal);
        frame.axes[AXIS_BRAKE] = step.brake.map_or(step.brake_axis, axis_from_pedal);
        frame.buttons[BUTTON_HAND_BRAKE] = step.hand_brake;
        for button in &step.press {
            frame.buttons[button.index()] = true;
        }

        if tick == 0 {
            frame
                .events
                .extend(step.press.iter().map(|b| InputEvent::ButtonDown(b.index())));
            frame
                .events
                .extend(step.commands.iter().copied().map(InputEvent::Command));
        }
        if tick + 1 == step.ticks {
            frame
                .events
                .extend(step.press.iter().map(|b| InputEvent::ButtonUp(b.index())));
        }
        frame
    }
}

impl InputDevice for ScriptedInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self) -> Result<InputFrame> {
        let Some(step) = self.steps.get(self.step) else {
            let mut frame = InputFrame::at_rest();
            if self.quit_at_end && !self.quit_sent {
                info!("input script finished");
                frame.events.push(InputEvent::Command(Command::Quit));
                self.quit_sent = true;
            }
            return Ok(frame);
        };

        let frame = Self::frame_for_step(step, self.tick_in_step);
        self.tick_in_step += 1;
        if self.tick_in_step >= step.ticks {
            self.step += 1;
            self.tick_in_step = 0;
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
[[step]]
ticks = 3
throttle = 0.5
steer = -0.25

[[step]]
ticks = 2
press = ["reverse"]
commands = ["advance_town"]
"#;

    #[test]
    fn test_step_axes_and_edges() {
        let mut input = ScriptedInput::from_toml(SCRIPT).unwrap();
        assert_eq!(input.remaining_ticks(), 5);

        let first = input.poll().unwrap();
        assert_eq!(first.axis(AXIS_STEER), -0.25);
        assert_eq!(first.axis(AXIS_THROTTLE), 0.0);
        assert_eq!(first.axis(AXIS_BRAKE), 1.0);
        assert!(first.events.is_empty());
        input.poll().unwrap();
        input.poll().unwrap();

        let press = input.poll().unwrap();
        assert_eq!(
            press.events,
            vec![
                InputEvent::ButtonDown(BUTTON_REVERSE),
                InputEvent::Command(Command::AdvanceTown)
            ]
        );
        let release = input.poll().unwrap();
        assert_eq!(release.events, vec![InputEvent::ButtonUp(BUTTON_REVERSE)]);
        assert_eq!(input.remaining_ticks(), 0);
    }

    #[test]
    fn test_quit_sent_once_at_end() {
        let mut input = ScriptedInput::from_toml("[[step]]\nticks = 1\n").unwrap();
        input.poll().unwrap();
        assert_eq!(
            input.poll().unwrap().events,
            vec![InputEvent::Command(Command::Quit)]
        );
        assert!(input.poll().unwrap().events.is_empty());
    }

    #[test]
    fn test_quit_at_end_disabled() {
        let mut input = ScriptedInput::from_toml("quit_at_end = false\n").unwrap();
        assert!(input.poll().unwrap().events.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = ScriptedInput::from_toml("[[step]]\nthrotle = 1.0\n");
        assert!(matches!(result, Err(CockpitError::Script { .. })));
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ScriptedInput::from_path(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(CockpitError::Script { .. })));
    }
}
