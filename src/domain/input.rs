// Packed per-tick player intents.

use serde::{Deserialize, Serialize};

/// Discrete intents a player can hold during a tick.
///
/// The discriminant is the bit index inside an [`InputFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Intent {
    MoveLeft = 0,
    MoveRight = 1,
    Jump = 2,
}

impl Intent {
    pub const ALL: [Intent; 3] = [Intent::MoveLeft, Intent::MoveRight, Intent::Jump];

    fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

/// Fixed-width bitfield of [`Intent`]s for one player and one tick.
///
/// Every bit pattern is a valid frame. Unknown high bits survive a round-trip
/// through the wire but never influence movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputFrame(u8);

impl InputFrame {
    /// All-zero frame used whenever a player sent nothing for a tick.
    pub const IDLE: InputFrame = InputFrame(0);

    pub fn encode<I>(intents: I) -> Self
    where
        I: IntoIterator<Item = Intent>,
    {
        let bits = intents
            .into_iter()
            .fold(0u8, |bits, intent| bits | intent.mask());
        Self(bits)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, intent: Intent) -> bool {
        self.0 & intent.mask() != 0
    }

    pub fn is_idle(self) -> bool {
        Intent::ALL.iter().all(|intent| !self.contains(*intent))
    }

    /// Known intents set in this frame, in bit order.
    pub fn intents(self) -> Vec<Intent> {
        Intent::ALL
            .into_iter()
            .filter(|intent| self.contains(*intent))
            .collect()
    }

    /// Horizontal direction: +1 right, -1 left, 0 when neither or both are held.
    pub fn horizontal_axis(self) -> f32 {
        match (
            self.contains(Intent::MoveLeft),
            self.contains(Intent::MoveRight),
        ) {
            (false, true) => 1.0,
            (true, false) => -1.0,
            _ => 0.0,
        }
    }
}
