use crate::world::SimError;
use serde::{Deserialize, Serialize};

/// One discrete command consumed per agent per tick.
///
/// Wire codes follow declaration order, `Pass = 0` through `BladeDown = 9`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum Action {
    Pass = 0,
    Continue = 1,
    SpeedUp = 2,
    SpeedDown = 3,
    Left = 4,
    Right = 5,
    YawLeft = 6,
    YawRight = 7,
    BladeUp = 8,
    BladeDown = 9,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Pass,
        Action::Continue,
        Action::SpeedUp,
        Action::SpeedDown,
        Action::Left,
        Action::Right,
        Action::YawLeft,
        Action::YawRight,
        Action::BladeUp,
        Action::BladeDown,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Action {
    type Error = SimError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Action::ALL
            .get(code as usize)
            .copied()
            .ok_or(SimError::InvalidAction { code })
    }
}
