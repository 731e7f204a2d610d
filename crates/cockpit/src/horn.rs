//! Horn output

use tracing::info;

use crate::error::Result;

/// Plays the horn once per press edge
pub trait Horn: Send {
    /// Sound the horn once
    fn sound(&mut self) -> Result<()>;

    /// Times the horn has sounded
    fn times_sounded(&self) -> u64;
}

/// Horn without an audio device; logs and counts each honk
#[derive(Debug, Default)]
pub struct HeadlessHorn {
    sounded: u64,
}

impl HeadlessHorn {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Horn for HeadlessHorn {
    fn sound(&mut self) -> Result<()> {
        self.sounded += 1;
        info!(count = self.sounded, "[HORN] Honk!");
        Ok(())
    }

    fn times_sounded(&self) -> u64 {
        self.sounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, InputFrame, BUTTON_HORN};
    use crate::mapper::{Action, ControlMapper};

    fn horn_frame(events: Vec<InputEvent>) -> InputFrame {
        InputFrame {
            events,
            ..InputFrame::at_rest()
        }
    }

    fn drive(horn: &mut dyn Horn, mapper: &mut ControlMapper, frame: &InputFrame) {
        for action in mapper.map(frame).actions {
            if action == Action::Honk {
                horn.sound().unwrap();
            }
        }
    }

    #[test]
    fn test_two_presses_in_one_tick_sound_twice() {
        let mut horn = HeadlessHorn::new();
        let mut mapper = ControlMapper::default();
        drive(
            &mut horn,
            &mut mapper,
            &horn_frame(vec![
                InputEvent::ButtonDown(BUTTON_HORN),
                InputEvent::ButtonUp(BUTTON_HORN),
                InputEvent::ButtonDown(BUTTON_HORN),
                InputEvent::ButtonUp(BUTTON_HORN),
            ]),
        );
        assert_eq!(horn.times_sounded(), 2);
    }

    #[test]
    fn test_held_button_sounds_once() {
        let mut horn = HeadlessHorn::new();
        let mut mapper = ControlMapper::default();
        for _ in 0..3 {
            drive(
                &mut horn,
                &mut mapper,
                &horn_frame(vec![InputEvent::ButtonDown(BUTTON_HORN)]),
            );
        }
        assert_eq!(horn.times_sounded(), 1);
    }
}
