// Domain-level errors for session workflows.

use crate::domain::state::{PlayerId, Role};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("no free spawn point for player {player_id}")]
    CapacityExceeded { player_id: PlayerId },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("input for tick {tick} is older than current tick {current}")]
    StaleInput { tick: u64, current: u64 },

    #[error("input for tick {tick} is more than {lead} ticks ahead of tick {current}")]
    InputTooEarly { tick: u64, current: u64, lead: u64 },

    #[error("{operation} is not permitted for the {role:?} role")]
    AuthorityViolation { operation: &'static str, role: Role },

    #[error("player {0} is not in the roster")]
    UnknownPlayer(PlayerId),

    #[error("player {0} has already joined")]
    AlreadyJoined(PlayerId),

    #[error("session has terminated")]
    Terminated,
}
