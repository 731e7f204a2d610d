//! Vehicle control record and gear state

use serde::{Deserialize, Serialize};

/// Control record applied to the ego vehicle once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleControl {
    /// Steering in [-1, 1]
    pub steer: f64,
    /// Throttle in [0, 1]
    pub throttle: f64,
    /// Brake in [0, 1]
    pub brake: f64,
    pub hand_brake: bool,
    pub reverse: bool,
}

impl VehicleControl {
    pub fn gear(&self) -> Gear {
        Gear::from_reverse(self.reverse)
    }
}

/// Gear state shown on the HUD
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gear {
    #[default]
    Drive,
    Reverse,
}

impl Gear {
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            Gear::Reverse
        } else {
            Gear::Drive
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gear::Drive => "DRIVE",
            Gear::Reverse => "REVERSE",
        }
    }
}

impl std::fmt::Display for Gear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
