//! Control input mapper
//!
//! Turns one polled [`InputFrame`] into the vehicle control record for the
//! tick plus the discrete actions it triggered. Holds the reverse toggle and
//! the per-button held state used for edge detection.

use std::collections::HashSet;

use contracts::{Gear, VehicleControl};
use tracing::debug;

use crate::input::{
    Command, InputEvent, InputFrame, AXIS_BRAKE, AXIS_STEER, AXIS_THROTTLE, BUTTON_HAND_BRAKE,
    BUTTON_HORN, BUTTON_REVERSE,
};

/// Default deadzone threshold
pub const DEFAULT_DEADZONE: f64 = 0.1;

/// Force magnitudes below `threshold` to exactly zero; pass the rest through
pub fn apply_deadzone(value: f64, threshold: f64) -> f64 {
    if value.abs() < threshold {
        0.0
    } else {
        value
    }
}

/// Bipolar pedal axis (+1.0 at rest) to unipolar [0, 1]
pub fn pedal_from_axis(axis: f64) -> f64 {
    (-axis + 1.0) / 2.0
}

/// Discrete action triggered during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Honk,
    GearChanged(Gear),
    AdvanceWeather,
    AdvanceTown,
}

/// Result of mapping one tick of input
#[derive(Debug, Clone, PartialEq)]
pub struct TickInput {
    pub control: VehicleControl,
    pub actions: Vec<Action>,
}

impl TickInput {
    pub fn wants_quit(&self) -> bool {
        self.actions.contains(&Action::Quit)
    }
}

/// Deadzone filtering plus the gear/horn state machine
#[derive(Debug, Clone)]
pub struct ControlMapper {
    deadzone: f64,
    reverse: bool,
    held: HashSet<usize>,
}

impl ControlMapper {
    pub fn new(deadzone: f64) -> Self {
        Self {
            deadzone,
            reverse: false,
            held: HashSet::new(),
        }
    }

    pub fn deadzone(&self) -> f64 {
        self.deadzone
    }

    pub fn gear(&self) -> Gear {
        Gear::from_reverse(self.reverse)
    }

    /// Map one polled frame
    pub fn map(&mut self, frame: &InputFrame) -> TickInput {
        let mut actions = Vec::new();

        for event in &frame.events {
            match *event {
                InputEvent::ButtonDown(button) => {
                    // repeated downs without a release are one edge
                    if self.held.insert(button) {
                        self.on_button_edge(button, &mut actions);
                    }
                }
                InputEvent::ButtonUp(button) => {
                    self.held.remove(&button);
                }
                InputEvent::Command(command) => self.on_command(command, &mut actions),
            }
        }

        let control = VehicleControl {
            steer: apply_deadzone(frame.axis(AXIS_STEER), self.deadzone),
            throttle: apply_deadzone(pedal_from_axis(frame.axis(AXIS_THROTTLE)), self.deadzone),
            brake: apply_deadzone(pedal_from_axis(frame.axis(AXIS_BRAKE)), self.deadzone),
            hand_brake: frame.button(BUTTON_HAND_BRAKE),
            reverse: self.reverse,
        };

        debug!(
            steer = control.steer,
            throttle = control.throttle,
            brake = control.brake,
            gear = %control.gear(),
            "control mapped"
        );
        TickInput { control, actions }
    }

    fn on_button_edge(&mut self, button: usize, actions: &mut Vec<Action>) {
        match button {
            BUTTON_REVERSE => self.on_command(Command::ToggleReverse, actions),
            BUTTON_HORN => self.on_command(Command::Honk, actions),
            _ => {}
        }
    }

    fn on_command(&mut self, command: Command, actions: &mut Vec<Action>) {
        let action = match command {
            Command::Quit => Action::Quit,
            Command::ToggleReverse => {
                self.reverse = !self.reverse;
                debug!(gear = %self.gear(), "gear toggled");
                Action::GearChanged(self.gear())
            }
            Command::Honk => Action::Honk,
            Command::AdvanceWeather => Action::AdvanceWeather,
            Command::AdvanceTown => Action::AdvanceTown,
        };
        actions.push(action);
    }
}

impl Default for ControlMapper {
    fn default() -> Self {
        Self::new(DEFAULT_DEADZONE)
    }
}
